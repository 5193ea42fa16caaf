// JSON-RPC stdio server
pub mod rpc;

// Tool registry and dispatch
pub mod handler;
pub mod tools;
