//! Compact notation: duration codes, note/chord/rest tokens, and scale degrees.

mod degree;
mod duration;
mod token;

pub use degree::{parse_degree, DegreeItem, DegreeToken};
pub use duration::{
    duration_code_beats, parse_duration, parse_duration_expr, parse_duration_str, DOT_MULTIPLIER,
};
pub use token::{
    is_rest_str, parse_chord, parse_note, parse_rest, parse_token, Articulation, Expression, Token,
    TokenContext, TokenKind,
};
