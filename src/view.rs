//! Raffle list rendering
//!
//! Turns a [`RaffleListState`] into table rows with the same columns the web view
//! shows: name, status and view/edit links.

use std::fmt::Write as _;

use alloy_primitives::Address;
use serde::Serialize;

use crate::discovery::{ListPhase, RaffleId, RaffleListState, RaffleRow};

/// Client-side route of a raffle's detail page
pub fn view_link(address: Address) -> String {
    format!("/raffle/{}", address.to_checksum(None))
}

/// Client-side route of a raffle's edit page
pub fn edit_link(address: Address) -> String {
    format!("/raffleOverview/{}", address.to_checksum(None))
}

/// Display status of a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum RowStatus {
    Active,
    Loading,
    /// Discovery stopped before this row resolved
    Cancelled,
    Failed(String),
}

impl RowStatus {
    fn label(&self) -> String {
        match self {
            RowStatus::Active => "Active".to_string(),
            RowStatus::Loading => "Loading".to_string(),
            RowStatus::Cancelled => "Cancelled".to_string(),
            RowStatus::Failed(reason) => format!("Failed: {}", reason),
        }
    }
}

/// One rendered raffle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub id: RaffleId,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub address: Option<Address>,
    pub status: RowStatus,
    pub view_link: Option<String>,
    pub edit_link: Option<String>,
}

impl TableRow {
    fn from_row(id: RaffleId, row: &RaffleRow, cancelled: bool) -> Self {
        let (name, image_url, address, status) = match row {
            RaffleRow::Pending if cancelled => (None, None, None, RowStatus::Cancelled),
            RaffleRow::Pending => (None, None, None, RowStatus::Loading),
            RaffleRow::Loaded(summary) => (
                Some(summary.name.clone()),
                Some(summary.image_url.clone()),
                Some(summary.contract_address),
                RowStatus::Active,
            ),
            RaffleRow::Failed(failure) => (
                None,
                None,
                failure.address,
                RowStatus::Failed(failure.to_string()),
            ),
        };

        Self {
            id,
            name,
            image_url,
            address,
            status,
            view_link: address.map(view_link),
            edit_link: address.map(edit_link),
        }
    }
}

/// Table for the "Your raffles" view
#[derive(Debug, Clone, Serialize)]
pub struct RaffleTable {
    pub phase: ListPhase,
    pub block: Option<u64>,
    pub rows: Vec<TableRow>,
}

impl RaffleTable {
    pub fn from_state(state: &RaffleListState) -> Self {
        let cancelled = state.phase() == &ListPhase::Cancelled;
        Self {
            phase: state.phase().clone(),
            block: state.block(),
            rows: state
                .rows()
                .map(|(id, row)| TableRow::from_row(id, row, cancelled))
                .collect(),
        }
    }

    /// Render as an aligned plain-text table
    pub fn render_text(&self) -> String {
        const HEADERS: [&str; 5] = ["#", "Name", "Status", "View", "Edit"];

        let cells: Vec<[String; 5]> = self
            .rows
            .iter()
            .map(|row| {
                [
                    row.id.0.to_string(),
                    row.name.clone().unwrap_or_else(|| "-".to_string()),
                    row.status.label(),
                    row.view_link.clone().unwrap_or_else(|| "-".to_string()),
                    row.edit_link.clone().unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect();

        let mut widths = HEADERS.map(str::len);
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
        push_line(&mut out, &header, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        push_line(&mut out, &rule, &widths);
        for row in &cells {
            push_line(&mut out, row, &widths);
        }

        match &self.phase {
            ListPhase::Idle => out.push_str("No chain client connected\n"),
            ListPhase::Counting => out.push_str("Counting raffles...\n"),
            ListPhase::CountFailed(reason) => {
                let _ = writeln!(out, "Could not read raffle count: {}", reason);
            }
            ListPhase::Cancelled => out.push_str("Discovery cancelled\n"),
            ListPhase::Resolving | ListPhase::Complete => {
                if self.rows.is_empty() {
                    out.push_str("No raffles found\n");
                }
            }
        }
        out
    }

    /// Render as pretty-printed JSON
    pub fn render_json(&self) -> Result<String, crate::error::Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize; 5]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}
