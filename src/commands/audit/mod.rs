mod auditor;
mod decode;
mod run;
mod sink;
mod source;
mod validate;

pub use run::run;
