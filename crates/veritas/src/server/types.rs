use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chain::has_accepted_prefix;
use crate::jobs::{Job, JobStatus};
use crate::pipeline::AnalysisRequest;

use super::error::ApiError;

pub const INVALID_ADDRESS_DETAIL: &str =
    "A valid Cardano wallet address (addr1... or addr_test1...) is required.";

const INPUT_SCHEMA: &str = include_str!("../../../../schema/input-v1.json");

/// Body of `POST /start_job`.
#[derive(Debug, Deserialize)]
pub struct StartJobRequest {
    pub input_data: InputData,
}

#[derive(Debug, Default, Deserialize)]
pub struct InputData {
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub wallet_address_1: Option<String>,
    #[serde(default)]
    pub wallet_address_2: Option<String>,
}

impl InputData {
    /// Validates the addresses and picks single-wallet or duel analysis.
    /// A blank second address means single-wallet analysis.
    pub fn into_request(self) -> Result<AnalysisRequest, ApiError> {
        let primary = self
            .wallet_address_1
            .or(self.wallet_address)
            .filter(|a| has_accepted_prefix(a))
            .ok_or_else(invalid_address)?;

        match self.wallet_address_2.filter(|a| !a.trim().is_empty()) {
            None => Ok(AnalysisRequest::single(primary)),
            Some(second) if has_accepted_prefix(&second) => {
                Ok(AnalysisRequest::duel(primary, second))
            }
            Some(_) => Err(invalid_address()),
        }
    }
}

fn invalid_address() -> ApiError {
    ApiError::BadRequest(INVALID_ADDRESS_DETAIL.to_string())
}

/// Query of `GET /status`.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub job_id: String,
}

/// Job as exposed over HTTP.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct JobResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub result: Option<String>,
    pub log: Option<String>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            result: job.result,
            log: job.log,
        }
    }
}

/// JSON Schema of `input_data`.
pub fn input_schema() -> Result<Value, serde_json::Error> {
    serde_json::from_str(INPUT_SCHEMA)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(single: Option<&str>, first: Option<&str>, second: Option<&str>) -> InputData {
        InputData {
            wallet_address: single.map(String::from),
            wallet_address_1: first.map(String::from),
            wallet_address_2: second.map(String::from),
        }
    }

    #[test]
    fn test_single_address_forms() {
        assert_eq!(
            input(Some("addr1abc"), None, None).into_request().unwrap(),
            AnalysisRequest::single("addr1abc")
        );
        assert_eq!(
            input(None, Some("addr_test1abc"), None)
                .into_request()
                .unwrap(),
            AnalysisRequest::single("addr_test1abc")
        );
    }

    #[test]
    fn test_blank_second_address_means_single() {
        for blank in ["", "   "] {
            assert_eq!(
                input(None, Some("addr1abc"), Some(blank))
                    .into_request()
                    .unwrap(),
                AnalysisRequest::single("addr1abc")
            );
        }
    }

    #[test]
    fn test_duel_request() {
        assert_eq!(
            input(None, Some("addr1abc"), Some("addr_test1xyz"))
                .into_request()
                .unwrap(),
            AnalysisRequest::duel("addr1abc", "addr_test1xyz")
        );
    }

    #[test]
    fn test_invalid_addresses_rejected() {
        let cases = [
            input(None, None, None),
            input(Some(""), None, None),
            input(Some("stake1uxyz"), None, None),
            input(Some("Addr1abc"), None, None),
            input(None, Some("addr1abc"), Some("DdzFF")),
        ];
        for case in cases {
            let err = case.into_request().unwrap_err();
            assert_eq!(err.to_string(), INVALID_ADDRESS_DETAIL);
        }
    }

    #[test]
    fn test_input_schema_parses() {
        let schema = input_schema().unwrap();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["wallet_address_2"].is_object());
        assert!(jsonschema::validator_for(&schema).is_ok());
    }
}
