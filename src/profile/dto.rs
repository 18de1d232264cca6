use serde::{Deserialize, Serialize};

/// Body for a profile update. Optional fields let the handler report every
/// missing one at once, same as registration.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub fname: Option<String>,
    pub lname: Option<String>,
    pub age: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ImageUrlResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_url_uses_client_facing_key() {
        let json = serde_json::to_string(&ImageUrlResponse {
            image_url: "https://fake.local/avatars/u/p.png".into(),
        })
        .unwrap();
        assert!(json.contains("\"imageUrl\""));
    }
}
