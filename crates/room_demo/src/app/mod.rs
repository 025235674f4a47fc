mod bootstrap;
mod runner;
mod session;

pub(crate) use runner::run;
