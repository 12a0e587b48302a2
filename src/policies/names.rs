//! Syntax checks for names, buckets, domains and URLs

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

/// Longest DNS label
pub const MAX_LABEL_LENGTH: usize = 63;

static RFC1035_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z]([-a-z0-9]*[a-z0-9])?$").ok());

static BUCKET_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9.\-]{3,63}$").ok());

static SUBDOMAIN_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").ok()
});

static QUALIFIED_NAME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").ok());

static URL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^https?://[A-Za-z0-9\[][^\s/?#]*(/[^\s]*)?$").ok());

fn matches(re: &LazyLock<Option<Regex>>, s: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(s))
}

/// Validate a DNS label style resource name
pub fn validate_rfc1035(name: &str) -> Result<(), ValidationError> {
    if name.len() > MAX_LABEL_LENGTH || !matches(&RFC1035_RE, name) {
        return Err(ValidationError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Validate a name that is also used as a prefix for generated objects
pub fn validate_name_with_max(name: &str, max: usize) -> Result<(), ValidationError> {
    validate_rfc1035(name)?;
    if name.len() > max {
        return Err(ValidationError::NameTooLong {
            name: name.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validate an S3 bucket or Azure container name
pub fn validate_bucket_name(bucket: &str) -> Result<(), ValidationError> {
    if !matches(&BUCKET_RE, bucket) {
        return Err(ValidationError::InvalidBucketName(bucket.to_string()));
    }
    Ok(())
}

/// Validate an RFC1123 subdomain
pub fn validate_domain(domain: &str) -> Result<(), ValidationError> {
    if domain.len() > 253 || !matches(&SUBDOMAIN_RE, domain) {
        return Err(ValidationError::InvalidDomain(domain.to_string()));
    }
    Ok(())
}

/// Validate an absolute http(s) URL
pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    if !matches(&URL_RE, url) {
        return Err(ValidationError::InvalidUrl(url.to_string()));
    }
    Ok(())
}

/// Validate an annotation key (`[prefix/]name`)
pub fn validate_annotation_key(key: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidAnnotationKey(key.to_string());
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };
    if let Some(prefix) = prefix
        && (prefix.len() > 253 || !matches(&SUBDOMAIN_RE, prefix))
    {
        return Err(invalid());
    }
    if name.len() > MAX_LABEL_LENGTH || !matches(&QUALIFIED_NAME_RE, name) {
        return Err(invalid());
    }
    Ok(())
}
