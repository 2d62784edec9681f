pub mod binance;

pub use binance::{BinanceClient, EarnPosition, KlineRow, OrderAck, SymbolInfo, SystemStatus};
