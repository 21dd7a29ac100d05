use async_trait::async_trait;
use gateway_error::AppResult;
use gateway_redis::RedisClient;
use std::time::Duration;

use super::{ScanPage, SessionStore};

// ConnectionManager is a cheap handle; each call works on its own clone so the
// store can be shared behind `&self`. Inherent methods are called by path:
// they take `&mut self` and would otherwise lose to the trait's `&self` ones.
#[async_trait]
impl SessionStore for RedisClient {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut client = self.clone();
        let value: Option<String> = RedisClient::get(&mut client, key).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let mut client = self.clone();
        RedisClient::set_ex(&mut client, key, value, ttl).await?;
        Ok(())
    }

    async fn set_keep_ttl(&self, key: &str, value: &str) -> AppResult<bool> {
        let mut client = self.clone();
        Ok(RedisClient::set_keep_ttl(&mut client, key, value).await?)
    }

    async fn scan_page(&self, pattern: &str, cursor: u64) -> AppResult<ScanPage> {
        let mut client = self.clone();
        let page = RedisClient::scan_page(&mut client, pattern, cursor).await?;
        Ok(ScanPage {
            cursor: page.cursor,
            keys: page.keys,
        })
    }
}
