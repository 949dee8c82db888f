use crate::domain::errors::ExecutionError;
use crate::domain::ports::ExecutionService;
use crate::domain::trading::position::Position;
use crate::domain::trading::types::{AccountBalance, Signal, TradeRecord};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::warn;

/// Placeholder for exchange order routing.
///
/// Reports a flat, empty account and refuses to place orders.
pub struct LiveExecutionStub {
    symbol: String,
}

impl LiveExecutionStub {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
        }
    }

    fn unsupported(&self, operation: &str) -> ExecutionError {
        ExecutionError::Unsupported {
            backend: format!("live/{}", self.symbol),
            operation: operation.to_string(),
        }
    }
}

#[async_trait]
impl ExecutionService for LiveExecutionStub {
    async fn execute_signal(&self, signal: &Signal) -> Result<(), ExecutionError> {
        warn!(
            "LiveExecutionStub: order routing not available, rejecting {} {} for {}",
            signal.action, signal.direction, self.symbol
        );
        Err(self.unsupported("execute_signal"))
    }

    async fn get_position(&self) -> Result<Position, ExecutionError> {
        Ok(Position::flat(&self.symbol))
    }

    async fn get_balance(&self) -> Result<AccountBalance, ExecutionError> {
        Ok(AccountBalance::default())
    }

    async fn get_trade_history(&self) -> Result<Vec<TradeRecord>, ExecutionError> {
        Ok(Vec::new())
    }

    async fn get_peak_equity(&self) -> Result<Decimal, ExecutionError> {
        Ok(Decimal::ZERO)
    }
}
