use crate::client::NavigationError;

/// BasePath
///
/// The URL prefix the client is deployed under, normalised the way web history
/// does it: always a leading slash, never a trailing one, so `/` and the empty
/// string both mean "deployed at the root".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BasePath(String);

impl BasePath {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self(String::new());
        }
        let with_slash = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        Self(with_slash.trim_end_matches('/').to_string())
    }

    /// from_build_env
    ///
    /// Base path baked in at compile time through `BASE_URL`, `/` when unset.
    pub fn from_build_env() -> Self {
        Self::new(option_env!("BASE_URL").unwrap_or("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// strip
    ///
    /// Maps a browser path to a route path. A path outside the base is returned
    /// untouched; the base itself maps to `/`.
    pub fn strip<'a>(&self, location: &'a str) -> &'a str {
        let base = self.0.as_str();
        if base.is_empty() {
            return location;
        }
        match location.get(..base.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(base) => {
                let rest = &location[base.len()..];
                if rest.is_empty() { "/" } else { rest }
            }
            _ => location,
        }
    }

    /// Browser URL for a route path.
    pub fn href(&self, route: &str) -> String {
        format!("{}{}", self.0, route)
    }
}

/// Path part of a location, without query string or fragment.
pub fn route_path(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    match &location[..end] {
        "" => "/",
        path => path,
    }
}

/// WebHistory
///
/// The session history stack: entries are route paths, `position` points at the
/// current one. Pushing drops any forward entries, as browsers do.
#[derive(Debug, Clone)]
pub struct WebHistory {
    base: BasePath,
    entries: Vec<String>,
    position: usize,
}

impl WebHistory {
    /// Starts a history whose first entry is the browser location `initial`.
    pub fn new(base: BasePath, initial: &str) -> Self {
        let start = base.strip(initial).to_string();
        Self {
            base,
            entries: vec![start],
            position: 0,
        }
    }

    pub fn base(&self) -> &BasePath {
        &self.base
    }

    pub fn location(&self) -> &str {
        &self.entries[self.position]
    }

    pub fn push(&mut self, location: String) {
        self.entries.truncate(self.position + 1);
        self.entries.push(location);
        self.position += 1;
    }

    pub fn replace(&mut self, location: String) {
        self.entries[self.position] = location;
    }

    /// Entry `delta` steps away from the current one.
    pub fn peek(&self, delta: isize) -> Result<&str, NavigationError> {
        self.target_index(delta)
            .map(|index| self.entries[index].as_str())
    }

    /// Moves the cursor by `delta` entries.
    pub fn go(&mut self, delta: isize) -> Result<(), NavigationError> {
        self.position = self.target_index(delta)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn target_index(&self, delta: isize) -> Result<usize, NavigationError> {
        self.position
            .checked_add_signed(delta)
            .filter(|index| *index < self.entries.len())
            .ok_or(NavigationError::NoHistory)
    }
}
