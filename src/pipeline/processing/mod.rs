// Pipeline processing: the stages between staging and commit, in run order

pub mod dedup;
pub mod normalize;
pub mod convert;
pub mod enrich;
pub mod filter;
pub mod validator;
