//! JavaScript evaluated inside the page.
//!
//! Each script is a self-invoking expression so it can be passed directly to
//! `Page::evaluate`.

/// Serializes the document plus every open shadow root.
///
/// Hosts are stamped with `data-boundary-root="<n>"` while serializing so the
/// Rust side can rebuild host → shadow-root edges; the stamps are removed
/// before returning. A shadow root reached from several places keeps one id.
pub const CAPTURE_BOUNDARIES: &str = r#"
(() => {
  const ATTR = 'data-boundary-root';
  const ids = new Map();
  const roots = [];
  const stamped = [];
  const queue = [document];

  while (queue.length > 0) {
    const scope = queue.shift();
    for (const el of scope.querySelectorAll('*')) {
      const root = el.shadowRoot;
      if (!root) continue;
      let id = ids.get(root);
      if (id === undefined) {
        id = roots.length + 1;
        ids.set(root, id);
        roots.push(root);
        queue.push(root);
      }
      el.setAttribute(ATTR, String(id));
      stamped.push(el);
    }
  }

  try {
    const boundaries = [document.documentElement.outerHTML];
    for (const root of roots) boundaries.push(root.innerHTML);
    return { url: location.href, boundaries };
  } finally {
    for (const el of stamped) el.removeAttribute(ATTR);
  }
})()
"#;

/// Function body for the readiness probe; see [`readiness_probe`].
const READINESS_PROBE_FN: &str = r#"
(selector) => {
  const seen = new Set();
  const search = (scope) => {
    if (scope.querySelector(selector)) return true;
    for (const el of scope.querySelectorAll('*')) {
      const root = el.shadowRoot;
      if (root && !seen.has(root)) {
        seen.add(root);
        if (search(root)) return true;
      }
    }
    return false;
  };
  try {
    return search(document);
  } catch (e) {
    return false;
  }
}
"#;

/// Expression that is true once `selector` matches in the document or in
/// any shadow root.
pub fn readiness_probe(selector: &str) -> String {
    let literal = serde_json::Value::from(selector).to_string();
    format!("({})({})", READINESS_PROBE_FN.trim(), literal)
}

/// Clicks the first consent "allow all" button found in the document or any
/// shadow root. Evaluates to whether something was clicked.
pub const DISMISS_CONSENT: &str = r#"
(() => {
  const selectors = [
    '#CybotCookiebotDialogBodyLevelButtonLevelOptinAllowAll',
    '#CybotCookiebotDialogBodyButtonAccept',
    'button[id*="accept-all"]',
    'button[id*="acceptAll"]',
    'button.accept-all',
    'button.acceptAll',
    'button.accept_all',
    'a[id*="accept-all"]',
  ];
  const seen = new Set();
  const scopes = [document];
  while (scopes.length > 0) {
    const scope = scopes.shift();
    for (const selector of selectors) {
      const button = scope.querySelector(selector);
      if (button) {
        button.click();
        return true;
      }
    }
    for (const el of scope.querySelectorAll('*')) {
      const root = el.shadowRoot;
      if (root && !seen.has(root)) {
        seen.add(root);
        scopes.push(root);
      }
    }
  }
  return false;
})()
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::BOUNDARY_ATTRIBUTE;

    #[test]
    fn test_capture_uses_boundary_attribute() {
        assert!(CAPTURE_BOUNDARIES.contains(&format!("'{}'", BOUNDARY_ATTRIBUTE)));
    }

    #[test]
    fn test_readiness_probe_escapes_selector() {
        let probe = readiness_probe(r#"a[title="x"]"#);
        assert!(probe.ends_with(r#"("a[title=\"x\"]")"#));
        assert!(probe.starts_with("((selector) =>"));
    }
}
