use anyhow::{Context, Result};
use log::info;
use rusqlite::{params, OptionalExtension, Row};

use crate::{
    db::{helpers::parse_challenge_type, Database},
    models::{Challenge, ChallengeType},
};

const DEFAULT_CATALOG: &str = include_str!("../seeds/default_catalog.sql");

fn row_to_challenge(row: &Row) -> Result<Challenge> {
    let kind: String = row.get("type")?;

    Ok(Challenge {
        id: row.get("id")?,
        kind: parse_challenge_type(&kind)?,
        target_value: row.get("target_value")?,
        animal_name: row.get("animal_name")?,
        animal_image_url: row.get("animal_image_url")?,
        audio_prompt_url: row.get("audio_prompt_url")?,
    })
}

/// Fields for a challenge that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewChallenge {
    pub kind: ChallengeType,
    pub target_value: String,
    pub animal_name: String,
    pub animal_image_url: String,
    pub audio_prompt_url: Option<String>,
}

impl Database {
    pub async fn insert_challenge(&self, challenge: NewChallenge) -> Result<Challenge> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO challenges (type, target_value, animal_name, animal_image_url, audio_prompt_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    challenge.kind.as_str(),
                    challenge.target_value,
                    challenge.animal_name,
                    challenge.animal_image_url,
                    challenge.audio_prompt_url,
                ],
            )
            .context("failed to insert challenge")?;

            Ok(Challenge {
                id: conn.last_insert_rowid(),
                kind: challenge.kind,
                target_value: challenge.target_value,
                animal_name: challenge.animal_name,
                animal_image_url: challenge.animal_image_url,
                audio_prompt_url: challenge.audio_prompt_url,
            })
        })
        .await
    }

    pub async fn get_challenge(&self, challenge_id: i64) -> Result<Option<Challenge>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, type, target_value, animal_name, animal_image_url, audio_prompt_url
                 FROM challenges
                 WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![challenge_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_challenge(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Random challenge; with a user id, only ones that user has not
    /// unlocked yet.
    pub async fn random_unseen_challenge(&self, user_id: Option<String>) -> Result<Option<Challenge>> {
        self.execute(move |conn| {
            let challenge = match user_id {
                Some(user_id) => {
                    let mut stmt = conn.prepare(
                        "SELECT c.id, c.type, c.target_value, c.animal_name, c.animal_image_url, c.audio_prompt_url
                         FROM challenges c
                         LEFT JOIN progress p
                           ON p.challenge_id = c.id
                          AND p.user_id = ?1
                          AND p.is_unlocked = 1
                         WHERE p.challenge_id IS NULL
                         ORDER BY RANDOM()
                         LIMIT 1",
                    )?;
                    let mut rows = stmt.query(params![user_id])?;
                    match rows.next()? {
                        Some(row) => Some(row_to_challenge(row)?),
                        None => None,
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, type, target_value, animal_name, animal_image_url, audio_prompt_url
                         FROM challenges
                         ORDER BY RANDOM()
                         LIMIT 1",
                    )?;
                    let mut rows = stmt.query([])?;
                    match rows.next()? {
                        Some(row) => Some(row_to_challenge(row)?),
                        None => None,
                    }
                }
            };
            Ok(challenge)
        })
        .await
    }

    pub async fn challenge_count(&self) -> Result<i64> {
        self.execute(|conn| {
            let count = conn
                .query_row("SELECT COUNT(*) FROM challenges", [], |row| row.get(0))
                .optional()?
                .unwrap_or(0);
            Ok(count)
        })
        .await
    }

    /// Loads the bundled catalog when the store has no challenges yet.
    /// Returns how many challenges were added.
    pub async fn seed_default_challenges(&self) -> Result<i64> {
        self.execute(|conn| {
            let existing: i64 =
                conn.query_row("SELECT COUNT(*) FROM challenges", [], |row| row.get(0))?;
            if existing > 0 {
                return Ok(0);
            }

            let tx = conn.transaction()?;
            tx.execute_batch(DEFAULT_CATALOG)
                .context("failed to seed default challenges")?;
            let seeded: i64 =
                tx.query_row("SELECT COUNT(*) FROM challenges", [], |row| row.get(0))?;
            tx.commit()?;

            info!("Seeded {seeded} default challenges");
            Ok(seeded)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_database;

    fn color(target: &str) -> NewChallenge {
        NewChallenge {
            kind: ChallengeType::Color,
            target_value: target.into(),
            animal_name: "Fox".into(),
            animal_image_url: "/stickers/fox.png".into(),
            audio_prompt_url: None,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch() {
        let (_dir, db) = temp_database();
        let stored = db.insert_challenge(color("red")).await.unwrap();
        assert!(stored.id > 0);

        let fetched = db.get_challenge(stored.id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert!(db.get_challenge(stored.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn random_challenge_skips_unlocked_ones() {
        let (_dir, db) = temp_database();
        let red = db.insert_challenge(color("red")).await.unwrap();
        let blue = db.insert_challenge(color("blue")).await.unwrap();
        let user = "6f1c1c1e-3a53-4f7e-9a3c-2d1f1b0c9a11".to_string();

        db.save_found(&user, red.id).await.unwrap();
        for _ in 0..10 {
            let next = db
                .random_unseen_challenge(Some(user.clone()))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(next.id, blue.id);
        }

        db.save_found(&user, blue.id).await.unwrap();
        assert!(db
            .random_unseen_challenge(Some(user.clone()))
            .await
            .unwrap()
            .is_none());

        // Anonymous players draw from the whole catalog.
        assert!(db.random_unseen_challenge(None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn seeding_only_fills_an_empty_store() {
        let (_dir, db) = temp_database();
        let seeded = db.seed_default_challenges().await.unwrap();
        assert!(seeded > 0);
        assert_eq!(db.challenge_count().await.unwrap(), seeded);
        assert_eq!(db.seed_default_challenges().await.unwrap(), 0);
    }
}
