//! Producers of common table expressions, by cte id.
//!
//! A `CteConsumer` has no children: its properties are the producer's,
//! with the producer's columns replaced positionally by the consumer's.

use crate::column::{ColumnId, ColumnMapping};
use crate::error::{OptError, Result};
use crate::expr::{LogicalOp, Operator};
use crate::node::ExprRef;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct CteInfo {
    producers: HashMap<u32, ExprRef>,
}

impl CteInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a `CteProducer` node under its cte id.
    pub fn register_producer(&mut self, producer: ExprRef) -> Result<()> {
        let cte_id = match producer.op() {
            Operator::Logical(LogicalOp::CteProducer { cte_id, .. }) => *cte_id,
            other => {
                return Err(OptError::unsupported(format!(
                    "{} is not a cte producer",
                    other
                )))
            }
        };
        if self.producers.contains_key(&cte_id) {
            return Err(OptError::invariant(format!(
                "cte {} already has a producer",
                cte_id
            )));
        }
        self.producers.insert(cte_id, producer);
        Ok(())
    }

    pub fn producer(&self, cte_id: u32) -> Result<&ExprRef> {
        self.producers
            .get(&cte_id)
            .ok_or_else(|| OptError::lookup(format!("cte {} has no producer", cte_id)))
    }

    pub fn producer_columns(&self, cte_id: u32) -> Result<&[ColumnId]> {
        match self.producer(cte_id)?.op() {
            Operator::Logical(LogicalOp::CteProducer { columns, .. }) => Ok(columns),
            other => Err(OptError::invariant(format!(
                "cte {} is registered with {}",
                cte_id, other
            ))),
        }
    }

    /// Producer column to consumer column, by position.
    pub fn consumer_mapping(&self, cte_id: u32, consumer_columns: &[ColumnId]) -> Result<ColumnMapping> {
        let produced = self.producer_columns(cte_id)?;
        if produced.len() != consumer_columns.len() {
            return Err(OptError::unsupported(format!(
                "cte {} produces {} columns, consumer reads {}",
                cte_id,
                produced.len(),
                consumer_columns.len()
            )));
        }
        Ok(produced
            .iter()
            .copied()
            .zip(consumer_columns.iter().copied())
            .collect())
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}
