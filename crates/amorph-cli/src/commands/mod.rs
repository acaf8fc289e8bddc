pub mod add_uid;
pub mod bench;
pub mod edit;
pub mod fmt;
pub mod migrate_calls;
pub mod minify;
pub mod pack;
pub mod rewrite;
pub mod run;
pub mod suggest;
pub mod validate;
