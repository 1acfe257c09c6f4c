use serde::Deserialize;

pub const USER_UPGRADED_EVENT: &str = "user.upgraded";

#[derive(Debug, Deserialize)]
pub struct PolkaWebhook {
    pub event: String,
    pub data: PolkaWebhookData,
}

#[derive(Debug, Deserialize)]
pub struct PolkaWebhookData {
    pub user_id: String,
}
