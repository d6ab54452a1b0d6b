pub mod client_chain;
pub mod evaluator;
pub mod executor;
pub mod responder;
pub mod validator;
