use serde::Deserialize;

/// Envelope every Ocean endpoint wraps its payload in.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub data: T,
    #[serde(default)]
    pub page: Option<ApiPage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPage {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Pool pair as returned by `/poolpairs/{id}`. Amounts stay as the decimal
/// strings Ocean sends.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolPairData {
    pub id: String,
    pub symbol: String,
    pub token_a: PoolPairToken,
    pub token_b: PoolPairToken,
    pub price_ratio: PriceRatio,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolPairToken {
    pub id: String,
    pub symbol: String,
    pub reserve: String,
}

/// `ab` = reserveA / reserveB, `ba` = reserveB / reserveA.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceRatio {
    pub ab: String,
    pub ba: String,
}

/// Token held in an address account.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressToken {
    pub id: String,
    pub amount: String,
    pub symbol: String,
}
