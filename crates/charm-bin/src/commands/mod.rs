pub mod expand;
pub mod inspect;
pub mod pack;
