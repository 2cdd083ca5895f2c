//! Slot reconstruction and cross-entity reports.

use super::Tx;
use crate::compute::aggregate::average_slots;
use crate::compute::slots::reconstruct;
use crate::compute::temporal::Window;
use crate::config::{EntityId, ValueReport, ValueReportRecord};
use crate::error::{DialError, Result, ResultExt};
use std::time::{Duration, SystemTime};

impl Tx<'_> {
    /// Dense per-slot values of `entity` over `window`, carrying the last
    /// known value forward.
    pub fn reconstruct_slots(&self, entity: EntityId, window: &Window) -> Result<Vec<i64>> {
        self.check_cancelled()?;
        if window.is_empty() {
            return Ok(Vec::new());
        }
        self.check_slot_budget(window)?;
        self.reconstruct_within(entity, window)
    }

    fn reconstruct_within(&self, entity: EntityId, window: &Window) -> Result<Vec<i64>> {
        let seed = self.value_at_or_before(entity, window.start())?;
        let snapshots = self.values_in_range(entity, window.start(), window.end())?;
        Ok(reconstruct(seed, &snapshots, window))
    }

    /// Report over every entity visible to the acting user. Without an acting
    /// user the entity set is empty and every slot averages to 0.
    pub fn build_report(
        &self,
        start: SystemTime,
        end: SystemTime,
        interval: Duration,
    ) -> Result<ValueReport> {
        self.check_cancelled()?;
        let entities = match self.caller() {
            Some(caller) => self.db.directory.visible_entities(caller)?,
            None => Vec::new(),
        };
        self.build_report_for(&entities, start, end, interval)
    }

    /// Per-slot rounded mean of the reconstructed values of `entities`.
    ///
    /// Fails as a whole if any entity is missing or its history cannot be
    /// read; the error names the entity.
    pub fn build_report_for(
        &self,
        entities: &[EntityId],
        start: SystemTime,
        end: SystemTime,
        interval: Duration,
    ) -> Result<ValueReport> {
        self.check_cancelled()?;
        let window = Window::new(start, end, interval)?;
        if window.is_empty() {
            return Err(DialError::invalid_window(
                "end must be at least one interval after start",
            ));
        }
        self.check_slot_budget(&window)?;
        log::debug!(
            "building report over {} entities x {} slots",
            entities.len(),
            window.slot_count()
        );

        let mut sequences = Vec::with_capacity(entities.len());
        for &entity in entities {
            self.check_cancelled()?;
            let sequence = self
                .reconstruct_existing(entity, &window)
                .with_context(|| format!("reconstruct entity {}", entity))?;
            sequences.push(sequence);
        }

        let records = window
            .slot_starts()
            .zip(average_slots(&sequences, window.slot_count()))
            .map(|(timestamp, value)| ValueReportRecord { timestamp, value })
            .collect();
        Ok(ValueReport::new(records))
    }

    fn reconstruct_existing(&self, entity: EntityId, window: &Window) -> Result<Vec<i64>> {
        if self.entity_value(entity)?.is_none() {
            return Err(DialError::not_found(format!("Dial {} not found.", entity)));
        }
        self.reconstruct_within(entity, window)
    }

    fn check_slot_budget(&self, window: &Window) -> Result<()> {
        let max = self.db.config.max_report_slots;
        let slots = window.slot_count();
        if slots > max {
            return Err(DialError::invalid_window(format!(
                "{} slots exceeds the limit of {}",
                slots, max
            )));
        }
        if near_slot_budget(slots, max) {
            log::warn!("report window uses {} of {} allowed slots", slots, max);
        }
        Ok(())
    }
}

fn near_slot_budget(slots: usize, max: usize) -> bool {
    slots.saturating_mul(10) >= max.saturating_mul(9)
}
