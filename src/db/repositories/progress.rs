use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Row};

use crate::{
    db::{
        helpers::{format_timestamp, parse_challenge_type, parse_datetime},
        Database,
    },
    models::Sticker,
};

fn row_to_sticker(row: &Row) -> Result<Sticker> {
    let kind: String = row.get("type")?;
    let unlocked_at: String = row.get("unlocked_at")?;

    Ok(Sticker {
        challenge_id: row.get("challenge_id")?,
        animal_name: row.get("animal_name")?,
        animal_image_url: row.get("animal_image_url")?,
        kind: parse_challenge_type(&kind)?,
        target_value: row.get("target_value")?,
        unlocked_at: parse_datetime(&unlocked_at, "unlocked_at")?,
    })
}

const STICKER_COLUMNS: &str =
    "c.id AS challenge_id, c.animal_name, c.animal_image_url, c.type, c.target_value, p.unlocked_at";

impl Database {
    /// Records the unlock for (user, challenge). Unlocking again refreshes
    /// the timestamp instead of adding a row. `None` when the challenge
    /// does not exist.
    pub async fn save_found(&self, user_id: &str, challenge_id: i64) -> Result<Option<Sticker>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM challenges WHERE id = ?1)",
                params![challenge_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO progress (user_id, challenge_id, is_unlocked, unlocked_at)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(user_id, challenge_id)
                 DO UPDATE SET is_unlocked = 1, unlocked_at = excluded.unlocked_at",
                params![user_id, challenge_id, format_timestamp(Utc::now())],
            )?;

            let sticker = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {STICKER_COLUMNS}
                     FROM progress p
                     INNER JOIN challenges c ON c.id = p.challenge_id
                     WHERE p.user_id = ?1 AND p.challenge_id = ?2"
                ))?;
                let mut rows = stmt.query(params![user_id, challenge_id])?;
                match rows.next()? {
                    Some(row) => Some(row_to_sticker(row)?),
                    None => None,
                }
            };

            tx.commit()?;
            Ok(sticker)
        })
        .await
    }

    /// Unlocked stickers for a user, most recent first.
    pub async fn unlocked_stickers(&self, user_id: &str) -> Result<Vec<Sticker>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STICKER_COLUMNS}
                 FROM progress p
                 INNER JOIN challenges c ON c.id = p.challenge_id
                 WHERE p.user_id = ?1 AND p.is_unlocked = 1
                 ORDER BY p.unlocked_at DESC"
            ))?;

            let mut rows = stmt.query(params![user_id])?;
            let mut stickers = Vec::new();
            while let Some(row) = rows.next()? {
                stickers.push(row_to_sticker(row)?);
            }
            Ok(stickers)
        })
        .await
    }
}
