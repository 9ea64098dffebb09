pub mod inspect;
pub mod scan;
pub mod summarize;
