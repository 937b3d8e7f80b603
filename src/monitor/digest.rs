//! Minimal RFC 2617 digest authentication, as spoken by the device when
//! password protection is enabled.

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// A parsed `WWW-Authenticate: Digest …` challenge.
#[derive(Debug, Eq, PartialEq)]
pub struct Challenge {
    realm: String,
    nonce: String,
    qop: Option<String>,
    opaque: Option<String>,
}

impl Challenge {
    pub fn parse(header: &str) -> Option<Self> {
        let parameters = header.strip_prefix("Digest ").or_else(|| header.strip_prefix("digest "))?;
        let mut realm = None;
        let mut nonce = None;
        let mut qop = None;
        let mut opaque = None;
        for parameter in parameters.split(',') {
            let (key, value) = parameter.split_once('=')?;
            let value = value.trim().trim_matches('"').to_string();
            match key.trim() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "qop" => qop = Some(value),
                "opaque" => opaque = Some(value),
                _ => {}
            }
        }
        Some(Self { realm: realm?, nonce: nonce?, qop, opaque })
    }

    /// Build the `Authorization` header value for one request.
    pub fn answer(&self, credentials: &Credentials, method: &str, uri: &str, cnonce: &str) -> String {
        let ha1 = hex_md5(&format!(
            "{}:{}:{}",
            credentials.username, self.realm, credentials.password
        ));
        let ha2 = hex_md5(&format!("{method}:{uri}"));
        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{uri}""#,
            credentials.username, self.realm, self.nonce,
        );
        if self.qop.as_deref() == Some("auth") {
            let response =
                hex_md5(&format!("{ha1}:{}:00000001:{cnonce}:auth:{ha2}", self.nonce));
            header.push_str(&format!(
                r#", qop=auth, nc=00000001, cnonce="{cnonce}", response="{response}""#
            ));
        } else {
            let response = hex_md5(&format!("{ha1}:{}:{ha2}", self.nonce));
            header.push_str(&format!(r#", response="{response}""#));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{opaque}""#));
        }
        header
    }
}

fn hex_md5(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_challenge() {
        let challenge = Challenge::parse(
            r#"Digest realm="eGauge Administration", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", qop="auth""#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "eGauge Administration");
        assert_eq!(challenge.nonce, "dcd98b7102dd2f0e8b11d0f600bfb0c093");
        assert_eq!(challenge.qop.as_deref(), Some("auth"));
        assert_eq!(challenge.opaque, None);
    }

    #[test]
    fn test_parse_rejects_basic() {
        assert_eq!(Challenge::parse(r#"Basic realm="eGauge""#), None);
    }

    /// The worked example from RFC 2617 §3.5.
    #[test]
    fn test_answer_matches_rfc_example() {
        let challenge = Challenge::parse(concat!(
            r#"Digest realm="testrealm@host.com", qop="auth", "#,
            r#"nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", "#,
            r#"opaque="5ccc069c403ebaf9f0171e9517f40e41""#,
        ))
        .unwrap();
        let credentials = Credentials {
            username: "Mufasa".to_string(),
            password: "Circle Of Life".to_string(),
        };
        let header = challenge.answer(&credentials, "GET", "/dir/index.html", "0a4f113b");
        assert!(header.contains(r#"response="6629fae49393a05397450978507c4ef1""#), "{header}");
        assert!(header.contains(r#"opaque="5ccc069c403ebaf9f0171e9517f40e41""#));
    }
}
