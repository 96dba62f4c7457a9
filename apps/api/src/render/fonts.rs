//! Static font-metric tables for the three built-in page-description fonts.
//!
//! Widths are AFM glyph advances in 1/1000 em for the standard Helvetica
//! family, which viewers are required to provide without embedding. Tables
//! cover ASCII 0x20..=0x7E (95 printable characters); index =
//! `(char as usize) - 32`. The oblique cut shares the regular cut's metrics,
//! so two tables serve three variants.

use crate::render::parse::SpanStyle;

/// The three font variants the renderer can draw with, one per inline style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontVariant {
    Regular,
    Bold,
    Oblique,
}

impl FontVariant {
    pub fn for_style(style: SpanStyle) -> Self {
        match style {
            SpanStyle::Plain => FontVariant::Regular,
            SpanStyle::Bold => FontVariant::Bold,
            SpanStyle::Italic => FontVariant::Oblique,
        }
    }

    /// PostScript base font name used in the font dictionary.
    pub fn base_font(&self) -> &'static str {
        match self {
            FontVariant::Regular => "Helvetica",
            FontVariant::Bold => "Helvetica-Bold",
            FontVariant::Oblique => "Helvetica-Oblique",
        }
    }

    /// Resource name the content stream selects the font by.
    pub fn resource(&self) -> &'static str {
        match self {
            FontVariant::Regular => "F1",
            FontVariant::Bold => "F2",
            FontVariant::Oblique => "F3",
        }
    }

    fn widths(&self) -> &'static [u16; 95] {
        match self {
            // Oblique is a slanted regular; AFM widths are identical.
            FontVariant::Regular | FontVariant::Oblique => &HELVETICA_WIDTHS,
            FontVariant::Bold => &HELVETICA_BOLD_WIDTHS,
        }
    }
}

/// Bullet glyph advance (WinAnsi 0x95), same in both cuts.
const BULLET_WIDTH: u16 = 350;
/// Fallback advance for codepoints outside the table.
const FALLBACK_WIDTH: u16 = 556;

/// Measures the rendered width of `s` in points at `size`.
///
/// Non-ASCII characters fall back to a fixed average advance, except the
/// bullet glyph which the layout pass draws explicitly.
pub fn measure(variant: FontVariant, s: &str, size: f32) -> f32 {
    let widths = variant.widths();
    let milli: u32 = s
        .chars()
        .map(|c| {
            let code = c as usize;
            if (32..=126).contains(&code) {
                widths[code - 32] as u32
            } else if c == '\u{2022}' {
                BULLET_WIDTH as u32
            } else {
                FALLBACK_WIDTH as u32
            }
        })
        .sum();
    milli as f32 / 1000.0 * size
}

/// Helvetica (regular and oblique cuts).
#[rustfmt::skip]
static HELVETICA_WIDTHS: [u16; 95] = [
    // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0    1    2    3    4    5    6    7    8    9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // :    ;    <    =    >    ?    @
    278, 278, 584, 584, 584, 556, 1015,
    // A    B    C    D    E    F    G    H    I    J    K    L    M
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [    \    ]    ^    _    `
    278, 278, 278, 469, 556, 333,
    // a    b    c    d    e    f    g    h    i    j    k    l    m
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    // n    o    p    q    r    s    t    u    v    w    x    y    z
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // {    |    }    ~
    334, 260, 334, 584,
];

/// Helvetica-Bold.
#[rustfmt::skip]
static HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0    1    2    3    4    5    6    7    8    9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // :    ;    <    =    >    ?    @
    333, 333, 584, 584, 584, 611, 975,
    // A    B    C    D    E    F    G    H    I    J    K    L    M
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [    \    ]    ^    _    `
    333, 278, 333, 584, 556, 333,
    // a    b    c    d    e    f    g    h    i    j    k    l    m
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    // n    o    p    q    r    s    t    u    v    w    x    y    z
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    // {    |    }    ~
    389, 280, 389, 584,
];
