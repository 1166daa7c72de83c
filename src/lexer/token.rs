use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token {
    // Declarations
    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("class")]
    Class,
    #[token("interface")]
    Interface,
    #[token("typedef")]
    Typedef,
    #[token("enum")]
    Enum,
    #[token("abstract")]
    Abstract,
    #[token("extends")]
    Extends,
    #[token("implements")]
    Implements,
    #[token("function")]
    Function,
    #[token("var")]
    Var,
    #[token("final")]
    Final,
    #[token("new")]
    New,

    // Modifiers
    #[token("public")]
    Public,
    #[token("private")]
    Private,
    #[token("static")]
    Static,
    #[token("inline")]
    Inline,
    #[token("override")]
    Override,
    #[token("extern")]
    Extern,
    #[token("dynamic")]
    Dynamic,
    #[token("macro")]
    Macro,

    // Control flow
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("throw")]
    Throw,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("cast")]
    Cast,
    #[token("untyped")]
    Untyped,

    // Values
    #[token("this")]
    This,
    #[token("super")]
    Super,
    #[token("null")]
    Null,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // Literals
    #[regex(r"0[xX][0-9a-fA-F]+|[0-9]+", |lex| {
        let s = lex.slice();
        if s.starts_with("0x") || s.starts_with("0X") {
            i64::from_str_radix(&s[2..], 16).ok()
        } else {
            s.parse::<i64>().ok()
        }
    })]
    IntLit(i64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    FloatLit(f64),

    /// Double-quoted string. Contents are decoded by the parser from the source slice.
    #[regex(r#""([^"\\]|\\.)*""#)]
    DoubleString,

    /// Single-quoted string, the interpolating form.
    #[regex(r"'([^'\\]|\\.)*'")]
    SingleString,

    /// `@:meta` or `@meta`; payload is the name without the sigil.
    #[regex(r"@:?[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().trim_start_matches('@').to_string())]
    Meta(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // Operators
    #[token("++")]
    PlusPlus,
    #[token("+")]
    Plus,
    #[token("--")]
    MinusMinus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<<")]
    Shl,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("!")]
    Bang,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token("->")]
    Arrow,
    #[token("=>")]
    FatArrow,
    #[token("...")]
    DotDotDot,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,
}

/// Returns true if the given string is a reserved word of the language.
pub fn is_keyword(s: &str) -> bool {
    matches!(s, "package" | "import" | "class" | "interface" | "typedef" | "enum" | "abstract"
        | "extends" | "implements" | "function" | "var" | "final" | "new" | "public" | "private"
        | "static" | "inline" | "override" | "extern" | "dynamic" | "macro" | "return" | "if"
        | "else" | "while" | "do" | "for" | "in" | "break" | "continue" | "throw" | "try"
        | "catch" | "switch" | "case" | "default" | "cast" | "untyped" | "this" | "super"
        | "null" | "true" | "false")
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Token::Package => "package",
            Token::Import => "import",
            Token::Class => "class",
            Token::Interface => "interface",
            Token::Typedef => "typedef",
            Token::Enum => "enum",
            Token::Abstract => "abstract",
            Token::Extends => "extends",
            Token::Implements => "implements",
            Token::Function => "function",
            Token::Var => "var",
            Token::Final => "final",
            Token::New => "new",
            Token::Public => "public",
            Token::Private => "private",
            Token::Static => "static",
            Token::Inline => "inline",
            Token::Override => "override",
            Token::Extern => "extern",
            Token::Dynamic => "dynamic",
            Token::Macro => "macro",
            Token::Return => "return",
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::Do => "do",
            Token::For => "for",
            Token::In => "in",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Throw => "throw",
            Token::Try => "try",
            Token::Catch => "catch",
            Token::Switch => "switch",
            Token::Case => "case",
            Token::Default => "default",
            Token::Cast => "cast",
            Token::Untyped => "untyped",
            Token::This => "this",
            Token::Super => "super",
            Token::Null => "null",
            Token::True => "true",
            Token::False => "false",
            Token::IntLit(n) => return write!(f, "{n}"),
            Token::FloatLit(n) => return write!(f, "{n}"),
            Token::DoubleString | Token::SingleString => "string literal",
            Token::Meta(name) => return write!(f, "@{name}"),
            Token::Ident => "identifier",
            Token::PlusPlus => "++",
            Token::Plus => "+",
            Token::MinusMinus => "--",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::PlusEq => "+=",
            Token::MinusEq => "-=",
            Token::StarEq => "*=",
            Token::SlashEq => "/=",
            Token::PercentEq => "%=",
            Token::Eq => "=",
            Token::EqEq => "==",
            Token::BangEq => "!=",
            Token::Shl => "<<",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::LtEq => "<=",
            Token::GtEq => ">=",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Tilde => "~",
            Token::AmpAmp => "&&",
            Token::PipePipe => "||",
            Token::Bang => "!",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Semi => ";",
            Token::Colon => ":",
            Token::Arrow => "->",
            Token::FatArrow => "=>",
            Token::DotDotDot => "...",
            Token::Dot => ".",
            Token::Question => "?",
        };
        write!(f, "'{text}'")
    }
}
