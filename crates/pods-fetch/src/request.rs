//! Download requests and their cache fingerprints.

use md5::{Digest, Md5};

use pods_downloader::Options;

use crate::error::{FetchError, Result};
use crate::spec::Specification;

/// What to download, and how to file it in the cache
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    name: String,
    spec: Option<Specification>,
    released: bool,
    params: Options,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Request for a released pod, fetched from its manifest's `source`
    pub fn released(spec: Specification) -> Result<Self> {
        Self::builder().spec(spec).released(true).build()
    }

    /// Request for a pod taken from an arbitrary source
    pub fn external(name: impl Into<String>, params: Options) -> Result<Self> {
        Self::builder().name(name).params(params).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> Option<&Specification> {
        self.spec.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn params(&self) -> &Options {
        &self.params
    }

    /// Same request with different download parameters
    pub fn with_params(&self, params: Options) -> Self {
        Self {
            params,
            ..self.clone()
        }
    }

    /// Relative cache path for this request
    pub fn slug(&self) -> String {
        self.slug_for(&self.name, &self.params)
    }

    /// Relative cache path for `name` fetched with `params`.
    ///
    /// Released pods are filed by version, everything else by a digest of
    /// the sorted parameters. A manifest checksum adds a short suffix.
    pub fn slug_for(&self, name: &str, params: &Options) -> String {
        let checksum = self
            .spec
            .as_ref()
            .and_then(|spec| spec.checksum.as_deref())
            .map(|checksum| format!("-{}", checksum.chars().take(5).collect::<String>()))
            .unwrap_or_default();

        match self.released_version() {
            Some(version) => format!("Release/{}/{}{}", name, version, checksum),
            None => format!("External/{}/{}{}", name, params_digest(params), checksum),
        }
    }

    fn released_version(&self) -> Option<String> {
        if !self.released {
            return None;
        }
        self.spec
            .as_ref()
            .and_then(|spec| spec.version.as_ref())
            .map(|version| version.to_string())
    }
}

/// MD5 of the `key=value` pairs sorted by key and joined with `-`
fn params_digest(params: &Options) -> String {
    let mut pairs: Vec<_> = params.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let joined = pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("-");

    format!("{:x}", Md5::digest(joined.as_bytes()))
}

#[derive(Debug, Default)]
pub struct RequestBuilder {
    name: Option<String>,
    spec: Option<Specification>,
    released: bool,
    params: Option<Options>,
}

impl RequestBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn spec(mut self, spec: Specification) -> Self {
        self.spec = Some(spec);
        self
    }

    pub fn released(mut self, released: bool) -> Self {
        self.released = released;
        self
    }

    pub fn params(mut self, params: Options) -> Self {
        self.params = Some(params);
        self
    }

    /// Validate and build.
    ///
    /// A manifest supplies both the name and, through its `source`, the
    /// parameters.
    pub fn build(self) -> Result<Request> {
        let name = match &self.spec {
            Some(spec) => Some(spec.name.clone()),
            None => self.name,
        }
        .filter(|name| !name.is_empty())
        .ok_or_else(|| FetchError::InvalidRequest("Requires a name".to_string()))?;

        if self.released {
            let spec = self.spec.as_ref().ok_or_else(|| {
                FetchError::InvalidRequest("Must give a spec for a released download request".to_string())
            })?;
            if spec.version.is_none() {
                return Err(FetchError::InvalidRequest("Requires a version if released".to_string()));
            }
        }

        let params = self
            .spec
            .as_ref()
            .and_then(|spec| spec.source.clone())
            .or(self.params)
            .ok_or_else(|| FetchError::InvalidRequest("Requires params".to_string()))?;

        Ok(Request {
            name,
            spec: self.spec,
            released: self.released,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pods_downloader::{options_from, Scalar};

    fn alamofire() -> Specification {
        Specification::new("Alamofire")
            .with_version("5.9.1")
            .with_source(options_from([
                ("git", Scalar::from("https://github.com/Alamofire/Alamofire.git")),
                ("tag", Scalar::from("5.9.1")),
            ]))
    }

    #[test]
    fn test_released_slug() {
        let request = Request::released(alamofire()).unwrap();
        assert_eq!(request.slug(), "Release/Alamofire/5.9.1");

        let request = Request::released(alamofire().with_checksum("0123456789abcdef")).unwrap();
        assert_eq!(request.slug(), "Release/Alamofire/5.9.1-01234");
    }

    #[test]
    fn test_external_slug_is_order_insensitive() {
        let a = Request::external(
            "Alamofire",
            options_from([
                ("git", Scalar::from("https://github.com/Alamofire/Alamofire.git")),
                ("tag", Scalar::from("5.9.1")),
            ]),
        )
        .unwrap();
        let b = Request::external(
            "Alamofire",
            options_from([
                ("tag", Scalar::from("5.9.1")),
                ("git", Scalar::from("https://github.com/Alamofire/Alamofire.git")),
            ]),
        )
        .unwrap();

        assert_eq!(a.slug(), "External/Alamofire/6080750403335ee2d6b7847917a6113f");
        assert_eq!(a.slug(), b.slug());
    }

    #[test]
    fn test_slug_renders_booleans() {
        let request = Request::external(
            "A",
            options_from([
                ("git", Scalar::from("https://example.com/a.git")),
                ("commit", Scalar::from("abc123")),
                ("submodules", Scalar::from(true)),
            ]),
        )
        .unwrap();
        assert_eq!(request.slug(), "External/A/1cbeeafbe7af3dc48d1cdcb3657e19c3");
    }

    #[test]
    fn test_slug_discriminates() {
        let request = Request::external("A", options_from([("commit", Scalar::from("1"))])).unwrap();
        let other = options_from([("commit", Scalar::from("2"))]);
        assert_ne!(request.slug(), request.slug_for("A", &other));
        assert_ne!(request.slug(), request.slug_for("B", request.params()));
    }

    #[test]
    fn test_params_default_to_manifest_source() {
        let request = Request::builder()
            .spec(alamofire())
            .params(options_from([("http", Scalar::from("https://ignored.example/a.zip"))]))
            .build()
            .unwrap();
        assert_eq!(request.name(), "Alamofire");
        assert!(request.params().contains_key("git"));
        assert!(!request.is_released());
    }

    #[test]
    fn test_validation() {
        let err = Request::builder().params(Options::new()).build().unwrap_err();
        assert_eq!(err.to_string(), "Invalid download request: Requires a name");

        let err = Request::builder().name("A").released(true).build().unwrap_err();
        assert!(err.to_string().contains("Must give a spec"));

        let err = Request::released(Specification::new("A")).unwrap_err();
        assert!(err.to_string().contains("Requires a version"));

        let err = Request::builder().name("A").build().unwrap_err();
        assert!(err.to_string().contains("Requires params"));
    }
}
