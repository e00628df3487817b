//! Token model
//!
//! Token categories form a forest: abstract parents group concrete leaves
//! (for example an abstract `AdditionOperator` above `Plus` and `Minus`).
//! The tokenizer matches concrete categories only; the parser accepts any
//! token whose category descends from the one it expects.
//!
//! - [`TokenModel`] registers categories and answers hierarchy queries
//! - [`Token`] is one classified occurrence in the input
//! - [`TokenStream`] is the EOF-terminated sequence a parse session reads

pub mod category;
pub mod model;
pub mod token;
pub mod token_stream;

pub use category::{CategoryId, CustomMatcher, Group, TokenCategory, TokenPattern};
pub use model::{TokenModel, TokenModelError, EOF_NAME};
pub use token::Token;
pub use token_stream::TokenStream;
