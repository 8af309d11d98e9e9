//! Raffle draws over lottery ticket holders.
//!
//! Tickets are succeeded payment intents tagged `is_lottery = "true"` with a
//! `lot_id`. Each lot has at most one recorded winner until it is reset.

use chrono::Utc;
use payments::{PaymentIntent, PaymentProcessor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use store::{RaffleWinner, WinnerStore};

use crate::error::{BookingError, Result};

/// One lottery ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleEntry {
    pub ticket_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub lot_id: i32,
}

impl RaffleEntry {
    /// Builds an entry from a succeeded lottery intent; None for anything else.
    pub fn from_intent(intent: &PaymentIntent) -> Option<Self> {
        if !intent.is_succeeded() || intent.meta("is_lottery") != Some("true") {
            return None;
        }
        let lot_id = intent.meta("lot_id")?.trim().parse().ok()?;

        Some(Self {
            ticket_id: intent.meta("ticket_id").unwrap_or(intent.id.as_str()).to_string(),
            full_name: intent.meta("full_name").unwrap_or("Unknown").to_string(),
            email: intent
                .meta("email")
                .or(intent.receipt_email.as_deref())
                .unwrap_or_default()
                .to_string(),
            phone: intent.meta("phone").map(str::to_string),
            lot_id,
        })
    }

    fn into_winner(self) -> RaffleWinner {
        RaffleWinner {
            lot_id: self.lot_id,
            ticket_id: self.ticket_id,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            drawn_at: Utc::now(),
        }
    }
}

/// Result of drawing a lot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    /// A new winner was picked and recorded.
    Drawn(RaffleWinner),
    /// The lot already had a winner; nothing changed.
    AlreadyDrawn(RaffleWinner),
    /// Nobody holds a ticket for the lot.
    NoEntries,
}

impl DrawOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DrawOutcome::Drawn(_) => "drawn",
            DrawOutcome::AlreadyDrawn(_) => "already_drawn",
            DrawOutcome::NoEntries => "no_entries",
        }
    }

    pub fn winner(&self) -> Option<&RaffleWinner> {
        match self {
            DrawOutcome::Drawn(w) | DrawOutcome::AlreadyDrawn(w) => Some(w),
            DrawOutcome::NoEntries => None,
        }
    }
}

/// Draws and resets raffle winners.
pub struct RaffleDraw<W, P> {
    winners: W,
    processor: P,
}

impl<W: WinnerStore, P: PaymentProcessor> RaffleDraw<W, P> {
    pub fn new(winners: W, processor: P) -> Self {
        Self { winners, processor }
    }

    /// Lottery entries, optionally restricted to one lot.
    #[tracing::instrument(skip(self))]
    pub async fn entries(&self, lot_id: Option<i32>) -> Result<Vec<RaffleEntry>> {
        let intents = self.processor.list_succeeded_intents().await?;
        Ok(intents
            .iter()
            .filter_map(RaffleEntry::from_intent)
            .filter(|entry| lot_id.is_none_or(|lot| entry.lot_id == lot))
            .collect())
    }

    pub async fn winners(&self) -> Result<Vec<RaffleWinner>> {
        Ok(self.winners.list_winners().await?)
    }

    /// Draws a winner for the lot, at most once.
    #[tracing::instrument(skip(self))]
    pub async fn draw(&self, lot_id: i32) -> Result<DrawOutcome> {
        if let Some(existing) = self.winners.get_winner(lot_id).await? {
            return Ok(self.finish(DrawOutcome::AlreadyDrawn(existing)));
        }

        let pool = self.entries(Some(lot_id)).await?;
        let mut rng = StdRng::from_entropy();
        self.draw_from(lot_id, pool, &mut rng).await
    }

    /// Draws from an explicit pool with the given random source.
    ///
    /// Entries for other lots are ignored. A winner recorded concurrently
    /// wins over this draw.
    pub async fn draw_from<R: Rng + Send>(
        &self,
        lot_id: i32,
        pool: Vec<RaffleEntry>,
        rng: &mut R,
    ) -> Result<DrawOutcome> {
        if lot_id < 0 {
            return Err(BookingError::validation("Lot id must not be negative"));
        }
        if let Some(existing) = self.winners.get_winner(lot_id).await? {
            return Ok(self.finish(DrawOutcome::AlreadyDrawn(existing)));
        }

        let pool: Vec<RaffleEntry> = pool.into_iter().filter(|e| e.lot_id == lot_id).collect();
        let Some(chosen) = pool.choose(rng).cloned() else {
            return Ok(self.finish(DrawOutcome::NoEntries));
        };

        let winner = chosen.into_winner();
        let outcome = match self.winners.record_winner(winner.clone()).await? {
            Some(existing) => DrawOutcome::AlreadyDrawn(existing),
            None => {
                tracing::info!(lot_id, ticket_id = %winner.ticket_id, entrants = pool.len(), "Raffle winner drawn");
                DrawOutcome::Drawn(winner)
            }
        };
        Ok(self.finish(outcome))
    }

    /// Clears the lot's winner so it can be drawn again.
    #[tracing::instrument(skip(self))]
    pub async fn reset(&self, lot_id: i32) -> Result<bool> {
        let cleared = self.winners.clear_winner(lot_id).await?;
        if cleared {
            tracing::info!(lot_id, "Raffle draw reset");
        }
        Ok(cleared)
    }

    fn finish(&self, outcome: DrawOutcome) -> DrawOutcome {
        metrics::counter!("raffle_draws_total", "outcome" => outcome.label()).increment(1);
        outcome
    }
}
