pub mod coinbase_ws;

pub use coinbase_ws::CoinbaseWs;
