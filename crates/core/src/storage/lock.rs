use anyhow::Context;

// Advisory locks are scoped to the Postgres session. This is used as a
// best-effort guard against concurrent runs for the same symbol.
const LOCK_NAMESPACE: i64 = 0x4441_5942_5246; // "DAYBRF" as hex-ish namespace.

// FNV-1a keeps the key stable across processes (the std hasher is
// randomly seeded per process and would defeat the lock).
fn lock_key_for_symbol(symbol: &str) -> i64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in symbol.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    LOCK_NAMESPACE ^ (hash as i64)
}

pub async fn try_acquire_symbol_lock(pool: &sqlx::PgPool, symbol: &str) -> anyhow::Result<bool> {
    let key = lock_key_for_symbol(symbol);
    let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to acquire advisory lock (key={key})"))?;
    Ok(acquired.0)
}

pub async fn release_symbol_lock(pool: &sqlx::PgPool, symbol: &str) -> anyhow::Result<()> {
    let key = lock_key_for_symbol(symbol);
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .persistent(false)
        .bind(key)
        .execute(pool)
        .await
        .with_context(|| format!("failed to release advisory lock (key={key})"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_is_stable_across_calls() {
        assert_eq!(lock_key_for_symbol("IBM"), lock_key_for_symbol("IBM"));
    }

    #[test]
    fn different_symbols_get_different_keys() {
        assert_ne!(lock_key_for_symbol("IBM"), lock_key_for_symbol("AAPL"));
        assert_ne!(lock_key_for_symbol("IBM"), lock_key_for_symbol("ibm"));
    }
}
