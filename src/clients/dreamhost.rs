use crate::clients::{DnsProvider, OperationOutcome, ProviderRecord};
use crate::config::Config;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::net::Ipv4Addr;

pub const DEFAULT_SERVER: &str = "https://api.dreamhost.com";

/// Value of the `result` field on every successful DreamHost API call
const RESULT_SUCCESS: &str = "success";

/// DreamHost client - https://help.dreamhost.com/hc/en-us/articles/217560167-API-overview
///
/// Every call is a GET against the API root with `key`, `cmd` and `format=json`
/// plus command-specific parameters. Responses look like
/// `{"result": "success", "data": ...}` where `data` is a list for
/// `dns-list_records` and a short status string otherwise.
pub struct DreamhostClient {
    api_key: String,
    server: String,
    timeout: u64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    result: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ListedRecord {
    record: String,
    value: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl DreamhostClient {
    pub fn new(api_key: &str, config: &Config) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("api_key is required for DreamHost".into()));
        }

        let server = config
            .server
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());

        Ok(DreamhostClient {
            api_key: api_key.to_string(),
            server,
            timeout: config.timeout,
        })
    }

    fn command_url(&self, cmd: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{}/?key={}&cmd={}&format=json",
            self.server.trim_end_matches('/'),
            urlencoding::encode(&self.api_key),
            urlencoding::encode(cmd)
        );
        for (name, value) in params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    /// Run one API command and decode the envelope. Non-2xx and undecodable
    /// bodies are errors; the `result` field is left for the caller to judge.
    fn submit(&self, cmd: &str, params: &[(&str, &str)]) -> Result<ApiResponse> {
        let url = self.command_url(cmd, params);
        log::debug!("DreamHost command {} {:?}", cmd, params);

        let response = minreq::get(&url)
            .with_header("User-Agent", crate::USER_AGENT)
            .with_timeout(self.timeout)
            .send()?;

        let status_code = response.status_code;
        let body = response.as_str()?.trim().to_string();
        log::debug!("Response status: {}, body: {}", status_code, body);

        if !(200..300).contains(&status_code) {
            return Err(Error::Provider(format!(
                "{} failed with HTTP {}: {}",
                cmd, status_code, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Provider(format!("unparseable {} response: {}", cmd, e)))
    }

    fn write_record(&self, cmd: &str, domain: &str, ip: &str) -> Result<OperationOutcome> {
        let reply = self.submit(cmd, &[("record", domain), ("type", "A"), ("value", ip)])?;
        let message = data_text(&reply.data);

        log::info!("Result of {} for {} ({}) is {}: {}", cmd, domain, ip, reply.result, message);

        if reply.result == RESULT_SUCCESS {
            Ok(OperationOutcome::success(message))
        } else {
            Ok(OperationOutcome::failure(message))
        }
    }
}

impl fmt::Debug for DreamhostClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DreamhostClient")
            .field("api_key", &"<redacted>")
            .field("server", &self.server)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// `data` is a plain string for write commands and error replies
fn data_text(data: &serde_json::Value) -> String {
    match data {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl DnsProvider for DreamhostClient {
    fn list_records(&self) -> Result<Vec<ProviderRecord>> {
        let reply = self.submit("dns-list_records", &[])?;

        if reply.result != RESULT_SUCCESS {
            return Err(Error::Provider(format!(
                "dns-list_records refused: {}",
                data_text(&reply.data)
            )));
        }

        let listed: Vec<ListedRecord> = serde_json::from_value(reply.data)
            .map_err(|e| Error::Provider(format!("unexpected dns-list_records data: {}", e)))?;

        let records: Vec<ProviderRecord> = listed
            .into_iter()
            .filter(|r| r.kind.as_deref().map_or(true, |k| k.eq_ignore_ascii_case("A")))
            .map(|r| ProviderRecord::new(r.record, r.value))
            .collect();

        log::debug!("DreamHost lists {} A-records", records.len());
        Ok(records)
    }

    fn add_record(&self, domain: &str, ip: Ipv4Addr) -> Result<OperationOutcome> {
        self.write_record("dns-add_record", domain, &ip.to_string())
    }

    fn remove_record(&self, domain: &str, ip: &str) -> Result<OperationOutcome> {
        self.write_record("dns-remove_record", domain, ip)
    }

    fn provider_name(&self) -> &str {
        "DreamHost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> DreamhostClient {
        let config = Config {
            server: Some(server.url()),
            ..Default::default()
        };
        DreamhostClient::new("6SHU5P2HLDAYECUM", &config).unwrap()
    }

    fn command(cmd: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("key".into(), "6SHU5P2HLDAYECUM".into()),
            Matcher::UrlEncoded("cmd".into(), cmd.into()),
            Matcher::UrlEncoded("format".into(), "json".into()),
        ])
    }

    #[test]
    fn test_requires_api_key() {
        let config = Config::default();
        assert!(DreamhostClient::new("", &config).is_err());
    }

    #[test]
    fn test_debug_hides_api_key() {
        let server = mockito::Server::new();
        let client = client_for(&server);
        let debug_str = format!("{:?}", client);
        assert!(!debug_str.contains("6SHU5P2HLDAYECUM"));
        assert!(debug_str.contains("DreamhostClient"));
    }

    #[test]
    fn test_command_url_encodes_values() {
        let config = Config {
            server: Some("https://api.example.test/".to_string()),
            ..Default::default()
        };
        let client = DreamhostClient::new("a&b", &config).unwrap();
        let url = client.command_url("dns-add_record", &[("record", "a b.example.com")]);
        assert_eq!(
            url,
            "https://api.example.test/?key=a%26b&cmd=dns-add_record&format=json&record=a%20b.example.com"
        );
    }

    #[test]
    fn test_list_records_keeps_only_a_records_in_order() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/")
            .match_query(command("dns-list_records"))
            .with_status(200)
            .with_body(
                r#"{"result":"success","data":[
                    {"account_id":"1","zone":"example.com","record":"a.example.com","type":"A","value":"203.0.113.5","comment":"","editable":"1"},
                    {"account_id":"1","zone":"example.com","record":"example.com","type":"MX","value":"0 mx1.example.com","comment":"","editable":"0"},
                    {"account_id":"1","zone":"example.com","record":"a.example.com","type":"A","value":"203.0.113.6","comment":"","editable":"1"}
                ]}"#,
            )
            .create();

        let records = client_for(&server).list_records().unwrap();
        assert_eq!(
            records,
            vec![
                ProviderRecord::new("a.example.com", "203.0.113.5"),
                ProviderRecord::new("a.example.com", "203.0.113.6"),
            ]
        );
        mock.assert();
    }

    #[test]
    fn test_list_records_error_result_is_provider_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/")
            .match_query(command("dns-list_records"))
            .with_status(200)
            .with_body(r#"{"result":"error","data":"invalid_api_key"}"#)
            .create();

        let err = client_for(&server).list_records().unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert!(err.to_string().contains("invalid_api_key"));
    }

    #[test]
    fn test_list_records_http_failure() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("oops")
            .create();

        let err = client_for(&server).list_records().unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_list_records_malformed_body() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json at all")
            .create();

        let err = client_for(&server).list_records().unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[test]
    fn test_add_record_success() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::AllOf(vec![
                command("dns-add_record"),
                Matcher::UrlEncoded("record".into(), "b.example.com".into()),
                Matcher::UrlEncoded("type".into(), "A".into()),
                Matcher::UrlEncoded("value".into(), "203.0.113.5".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"result":"success","data":"record_added"}"#)
            .create();

        let outcome = client_for(&server)
            .add_record("b.example.com", Ipv4Addr::new(203, 0, 113, 5))
            .unwrap();
        assert_eq!(outcome, OperationOutcome::success("record_added"));
        mock.assert();
    }

    #[test]
    fn test_add_record_refusal_is_failed_outcome() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/")
            .match_query(command("dns-add_record"))
            .with_status(200)
            .with_body(r#"{"result":"error","data":"record_already_exists_not_editable"}"#)
            .create();

        let outcome = client_for(&server)
            .add_record("b.example.com", Ipv4Addr::new(203, 0, 113, 5))
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "record_already_exists_not_editable");
    }

    #[test]
    fn test_success_typo_is_not_success() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/")
            .match_query(command("dns-add_record"))
            .with_status(200)
            .with_body(r#"{"result":"sucess","data":"record_added"}"#)
            .create();

        let outcome = client_for(&server)
            .add_record("b.example.com", Ipv4Addr::new(203, 0, 113, 5))
            .unwrap();
        assert!(!outcome.success);
    }

    #[test]
    fn test_remove_record_targets_given_value() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::AllOf(vec![
                command("dns-remove_record"),
                Matcher::UrlEncoded("record".into(), "c.example.com".into()),
                Matcher::UrlEncoded("value".into(), "198.51.100.1".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"result":"success","data":"record_removed"}"#)
            .create();

        let outcome = client_for(&server)
            .remove_record("c.example.com", "198.51.100.1")
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message, "record_removed");
        mock.assert();
    }
}
