//! Parse, validate, search, index, and generate Doxygen client-side
//! search data (`html/search/*.js`).

pub mod cli;
pub mod generate;
pub mod index;
pub mod models;
pub mod search;
pub mod searchdata;
pub mod server;
pub mod validate;
