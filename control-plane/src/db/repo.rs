use chrono::Utc;
use protocol::{Millicredits, ServerState};
use sqlx::{Row, SqlitePool};

use super::models::{state_to_str, GameImage, Server, Transaction, TransactionKind, User};
use crate::error::ControlPlaneError;

/// Single writer of the control plane's database of record. Every mutation
/// that touches more than one row (a debit plus its ledger entry, a state
/// change plus its timestamp) goes through one `sqlx::Transaction` here
/// rather than being composed by callers.
#[derive(Clone)]
pub struct Repo {
    pool: SqlitePool,
}

impl Repo {
    pub async fn connect(db_path: &str) -> Result<Self, ControlPlaneError> {
        let opts = sqlx::sqlite::SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .connect_with(opts)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Repo { pool })
    }

    #[cfg(test)]
    pub async fn connect_in_memory() -> Result<Self, ControlPlaneError> {
        let pool = SqlitePool::connect(":memory:").await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Repo { pool })
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>, ControlPlaneError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn create_user(&self, email: &str) -> Result<User, ControlPlaneError> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO users (email, credits_millicredits, is_admin, created_at) VALUES (?, 0, 0, ?)",
        )
        .bind(email)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        self.get_user(id).await?.ok_or(ControlPlaneError::NotFound)
    }

    pub async fn get_game_image(&self, id: i64) -> Result<Option<GameImage>, ControlPlaneError> {
        let image = sqlx::query_as::<_, GameImage>("SELECT * FROM game_images WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(image)
    }

    pub async fn get_server(&self, id: i64) -> Result<Option<Server>, ControlPlaneError> {
        let server = sqlx::query_as::<_, Server>("SELECT * FROM servers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(server)
    }

    pub async fn create_server(
        &self,
        user_id: i64,
        game_image_id: i64,
        friendly_name: &str,
        env_vars: &std::collections::HashMap<String, String>,
        auto_sleep: bool,
    ) -> Result<Server, ControlPlaneError> {
        let now = Utc::now();
        let env_json = serde_json::to_string(env_vars)?;
        let id = sqlx::query(
            "INSERT INTO servers
             (user_id, game_image_id, friendly_name, env_vars, state, auto_sleep, created_at, last_state_change)
             VALUES (?, ?, ?, ?, 'SLEEPING', ?, ?, ?)",
        )
        .bind(user_id)
        .bind(game_image_id)
        .bind(friendly_name)
        .bind(env_json)
        .bind(auto_sleep)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        self.get_server(id).await?.ok_or(ControlPlaneError::NotFound)
    }

    pub async fn list_servers_in_state(&self, state: ServerState) -> Result<Vec<Server>, ControlPlaneError> {
        let servers = sqlx::query_as::<_, Server>("SELECT * FROM servers WHERE state = ?")
            .bind(state_to_str(state))
            .fetch_all(&self.pool)
            .await?;
        Ok(servers)
    }

    /// Compare-and-set on `(id, state)`. Returns `false` (no error) if the
    /// row's state no longer matches `expected` — a concurrent writer won
    /// the race and this caller's update is simply dropped.
    pub async fn cas_server_state(
        &self,
        id: i64,
        expected: ServerState,
        new: ServerState,
    ) -> Result<bool, ControlPlaneError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE servers SET state = ?, last_state_change = ? WHERE id = ? AND state = ?",
        )
        .bind(state_to_str(new))
        .bind(now)
        .bind(id)
        .bind(state_to_str(expected))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn set_server_bundle(
        &self,
        id: i64,
        proxy_container_id: &str,
        game_container_id: &str,
        public_port: u16,
        network_name: &str,
    ) -> Result<(), ControlPlaneError> {
        sqlx::query(
            "UPDATE servers
             SET proxy_container_id = ?, game_container_id = ?, public_port = ?, private_network_name = ?
             WHERE id = ?",
        )
        .bind(proxy_container_id)
        .bind(game_container_id)
        .bind(public_port as i64)
        .bind(network_name)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear_server_bundle(&self, id: i64) -> Result<(), ControlPlaneError> {
        sqlx::query(
            "UPDATE servers
             SET proxy_container_id = NULL, game_container_id = NULL, public_port = NULL, private_network_name = NULL
             WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Attempts to debit `amount` from the user's balance and append the
    /// matching ledger entry atomically. Returns `Ok(false)` without
    /// mutating anything if the balance would go negative.
    pub async fn try_debit(
        &self,
        user_id: i64,
        amount: Millicredits,
        kind: TransactionKind,
        description: &str,
    ) -> Result<bool, ControlPlaneError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT credits_millicredits FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ControlPlaneError::NotFound)?;
        let balance = Millicredits(row.get::<i64, _>("credits_millicredits"));

        let Some(remaining) = balance.checked_sub(amount) else {
            return Ok(false);
        };
        if remaining.0 < 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE users SET credits_millicredits = ? WHERE id = ?")
            .bind(remaining.0)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        sqlx::query(
            "INSERT INTO transactions (user_id, amount_millicredits, kind, timestamp, description)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(-amount.0)
        .bind(kind.as_str())
        .bind(now)
        .bind(description)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn add_credits(
        &self,
        user_id: i64,
        amount: Millicredits,
        description: &str,
    ) -> Result<(), ControlPlaneError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE users SET credits_millicredits = credits_millicredits + ? WHERE id = ?")
            .bind(amount.0)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        sqlx::query(
            "INSERT INTO transactions (user_id, amount_millicredits, kind, timestamp, description)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(amount.0)
        .bind(TransactionKind::Deposit.as_str())
        .bind(now)
        .bind(description)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_transactions_for_user(&self, user_id: i64) -> Result<Vec<Transaction>, ControlPlaneError> {
        let transactions = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_repo() -> Repo {
        let repo = Repo::connect_in_memory().await.unwrap();
        repo.create_user("player@example.com").await.unwrap();
        repo
    }

    #[tokio::test]
    async fn try_debit_refuses_when_balance_would_go_negative() {
        let repo = seeded_repo().await;
        let user = repo.get_user(1).await.unwrap().unwrap();
        assert_eq!(user.credits(), Millicredits(0));

        let charged = repo
            .try_debit(1, Millicredits(500), TransactionKind::HourlyCharge, "tick")
            .await
            .unwrap();
        assert!(!charged);

        let user = repo.get_user(1).await.unwrap().unwrap();
        assert_eq!(user.credits(), Millicredits(0));
        assert!(repo.list_transactions_for_user(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_credits_then_try_debit_keeps_the_ledger_consistent() {
        let repo = seeded_repo().await;
        repo.add_credits(1, Millicredits(1000), "deposit").await.unwrap();

        let charged = repo
            .try_debit(1, Millicredits(500), TransactionKind::HourlyCharge, "tick")
            .await
            .unwrap();
        assert!(charged);

        let user = repo.get_user(1).await.unwrap().unwrap();
        assert_eq!(user.credits(), Millicredits(500));

        let transactions = repo.list_transactions_for_user(1).await.unwrap();
        let total: i64 = transactions.iter().map(|t| t.amount_millicredits).sum();
        assert_eq!(total, user.credits_millicredits);
    }

    #[tokio::test]
    async fn cas_server_state_drops_update_on_mismatch() {
        let repo = seeded_repo().await;
        repo.create_user("owner2@example.com").await.unwrap();
        sqlx::query(
            "INSERT INTO game_images (friendly_name, image_ref, default_internal_port, min_ram_mb, min_cpu, protocol)
             VALUES ('mc', 'itzg/minecraft-server', 25565, 1024, 1.0, 'tcp')",
        )
        .execute(&repo.pool)
        .await
        .unwrap();
        let server = repo
            .create_server(1, 1, "my server", &std::collections::HashMap::new(), true)
            .await
            .unwrap();
        assert_eq!(server.state(), ServerState::Sleeping);

        let updated = repo
            .cas_server_state(server.id, ServerState::Running, ServerState::Sleeping)
            .await
            .unwrap();
        assert!(!updated, "CAS should not apply when expected state does not match");

        let updated = repo
            .cas_server_state(server.id, ServerState::Sleeping, ServerState::Running)
            .await
            .unwrap();
        assert!(updated);
        let server = repo.get_server(server.id).await.unwrap().unwrap();
        assert_eq!(server.state(), ServerState::Running);
    }
}
