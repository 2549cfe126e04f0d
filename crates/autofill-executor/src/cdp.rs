//! Chromium DevTools Protocol implementation of [`BrowserPort`].
//!
//! All DOM access goes through JS evaluation on a single page. Locators are
//! either CSS selectors or the positional scheme `index=N` over the page's
//! interactive controls, which discovery emits for label-wrapped inputs
//! that have no id or name.

use std::time::Duration;

use async_trait::async_trait;
use canonfill_core_types::{FormCandidate, OptionItem};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::errors::AutofillError;
use crate::model::{ElementProbe, ScannedField};
use crate::ports::BrowserPort;

#[derive(Clone, Debug)]
pub struct CdpBrowserConfig {
    pub headless: bool,
    pub nav_timeout_ms: u64,
    pub step_timeout_ms: u64,
}

impl Default for CdpBrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            nav_timeout_ms: 45_000,
            step_timeout_ms: 15_000,
        }
    }
}

/// Shared JS prelude: resolve a locator string to an element.
const RESOLVE_JS: &str = r#"
const resolve = (loc) => {
    if (loc.startsWith('index=')) {
        const n = parseInt(loc.slice(6), 10);
        const nodes = document.querySelectorAll('input, select, textarea');
        return Number.isInteger(n) && n >= 0 && n < nodes.length ? nodes[n] : null;
    }
    try { return document.querySelector(loc); } catch (_) { return null; }
};
"#;

pub struct CdpBrowser {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    config: CdpBrowserConfig,
}

impl CdpBrowser {
    #[instrument(skip_all, fields(headless = config.headless))]
    pub async fn launch(config: CdpBrowserConfig) -> Result<Self, AutofillError> {
        let mut builder = BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(AutofillError::Session)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| AutofillError::Session(e.to_string()))?;
        let handler_task = tokio::task::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "cdp handler event error");
                }
            }
        });
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AutofillError::Session(e.to_string()))?;
        Ok(Self {
            browser,
            page,
            handler_task,
            config,
        })
    }

    /// Tear the session down. Not called in keep-open mode, where release
    /// belongs to the session's own lifecycle.
    pub async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "browser close failed");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, AutofillError> {
        let fut = self.page.evaluate(script);
        let result = tokio::time::timeout(Duration::from_millis(self.config.step_timeout_ms), fut)
            .await
            .map_err(|_| AutofillError::StepTimeout(self.config.step_timeout_ms))?
            .map_err(|e| AutofillError::Element(e.to_string()))?;
        result
            .into_value::<T>()
            .map_err(|e| AutofillError::Element(format!("evaluation result: {e}")))
    }

    fn with_element(&self, locator: &str, body: &str) -> String {
        let loc = serde_json::to_string(locator).unwrap_or_else(|_| "\"\"".into());
        format!(
            "(() => {{ {RESOLVE_JS} const el = resolve({loc}); if (!el) return null; {body} }})()"
        )
    }
}

#[async_trait]
impl BrowserPort for CdpBrowser {
    async fn navigate(&self, url: &str) -> Result<(), AutofillError> {
        let nav = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| AutofillError::Navigation(e.to_string()))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| AutofillError::Navigation(e.to_string()))?;
            Ok::<(), AutofillError>(())
        };
        tokio::time::timeout(Duration::from_millis(self.config.nav_timeout_ms), nav)
            .await
            .map_err(|_| {
                AutofillError::Navigation(format!(
                    "timed out after {}ms loading {url}",
                    self.config.nav_timeout_ms
                ))
            })?
    }

    async fn collect_candidates(&self) -> Result<Vec<FormCandidate>, AutofillError> {
        let script = format!(
            r#"(() => {{
{RESOLVE_JS}
const controls = Array.from(document.querySelectorAll('input, select, textarea'));
const indexOf = (el) => controls.indexOf(el);
const out = [];
document.querySelectorAll('label').forEach((label) => {{
    const text = (label.innerText || '').trim();
    if (!text) return;
    const forAttr = label.getAttribute('for');
    if (forAttr) {{
        out.push({{ label_text: text, locator: '#' + CSS.escape(forAttr) }});
        return;
    }}
    const inner = label.querySelector('input, select, textarea');
    if (inner) {{
        const idx = indexOf(inner);
        if (idx >= 0) out.push({{ label_text: text, locator: 'index=' + idx }});
    }}
}});
controls.forEach((el, idx) => {{
    const placeholder = el.getAttribute('placeholder') || '';
    const name = el.getAttribute('name') || '';
    const label = placeholder || name;
    if (label) out.push({{ label_text: label, locator: 'index=' + idx }});
}});
return out;
}})()"#
        );
        self.eval(script).await
    }

    async fn scan_form_fields(&self) -> Result<Vec<ScannedField>, AutofillError> {
        let script = format!(
            r#"(() => {{
{RESOLVE_JS}
const nodes = Array.from(document.querySelectorAll('input, select, textarea'));
const results = [];
const radioGroups = new Map();
const getLabel = (el) => {{
    const id = el.getAttribute('id');
    if (id) {{
        const label = document.querySelector('label[for="' + CSS.escape(id) + '"]');
        if (label && label.innerText) return label.innerText.trim();
    }}
    const parentLabel = el.closest('label');
    if (parentLabel && parentLabel.innerText) return parentLabel.innerText.trim();
    const fieldset = el.closest('fieldset');
    if (fieldset) {{
        const legend = fieldset.querySelector('legend');
        if (legend && legend.innerText) return legend.innerText.trim();
    }}
    return '';
}};
const isRequired = (el) => {{
    if (el.required) return true;
    const aria = el.getAttribute('aria-required');
    return Boolean(aria && aria.toLowerCase() === 'true');
}};
nodes.forEach((el, index) => {{
    const tag = el.tagName.toLowerCase();
    const type = tag === 'input' ? (el.getAttribute('type') || 'text').toLowerCase() : tag;
    if (['submit', 'button', 'image', 'hidden', 'reset'].includes(type)) return;
    const name = el.getAttribute('name') || '';
    const id = el.getAttribute('id') || '';
    const required = isRequired(el);
    if (tag === 'input' && type === 'radio') {{
        const key = name || id || ('radio_' + index);
        const entry = radioGroups.get(key) || {{
            tag, type, name, id, label: getLabel(el), required: false, value: '', checked: null,
        }};
        entry.required = entry.required || required;
        if (el.checked) entry.value = el.value || '';
        radioGroups.set(key, entry);
        return;
    }}
    if (tag === 'input' && type === 'checkbox') {{
        results.push({{
            tag, type, name, id, label: getLabel(el), required,
            value: el.checked ? 'checked' : '', checked: Boolean(el.checked),
        }});
        return;
    }}
    results.push({{
        tag, type, name, id, label: getLabel(el), required,
        value: el.value || '', checked: null,
    }});
}});
for (const entry of radioGroups.values()) results.push(entry);
return results;
}})()"#
        );
        self.eval(script).await
    }

    async fn exists(&self, locator: &str) -> Result<bool, AutofillError> {
        let loc = serde_json::to_string(locator).unwrap_or_else(|_| "\"\"".into());
        let script = format!(
            "(() => {{ {RESOLVE_JS} return resolve({loc}) !== null; }})()"
        );
        self.eval(script).await
    }

    async fn probe(&self, locator: &str) -> Result<ElementProbe, AutofillError> {
        let script = self.with_element(
            locator,
            r#"return {
    tag: el.tagName.toLowerCase(),
    input_type: el.tagName.toLowerCase() === 'input'
        ? (el.getAttribute('type') || 'text').toLowerCase()
        : null,
};"#,
        );
        let probe: Option<ElementProbe> = self.eval(script).await?;
        probe.ok_or_else(|| AutofillError::Element(format!("no element for {locator}")))
    }

    async fn fill_text(&self, locator: &str, value: &str) -> Result<(), AutofillError> {
        let value_json = serde_json::to_string(value).unwrap_or_else(|_| "\"\"".into());
        let script = self.with_element(
            locator,
            &format!(
                r#"el.focus();
el.value = {value_json};
el.dispatchEvent(new Event('input', {{ bubbles: true }}));
el.dispatchEvent(new Event('change', {{ bubbles: true }}));
return true;"#
            ),
        );
        let ok: Option<bool> = self.eval(script).await?;
        match ok {
            Some(true) => Ok(()),
            _ => Err(AutofillError::Element(format!("fill failed for {locator}"))),
        }
    }

    async fn read_value(&self, locator: &str) -> Result<Option<String>, AutofillError> {
        let script = self.with_element(locator, "return el.value ?? null;");
        self.eval(script).await
    }

    async fn select_options(&self, locator: &str) -> Result<Vec<OptionItem>, AutofillError> {
        let script = self.with_element(
            locator,
            r#"if (el.tagName.toLowerCase() !== 'select') return [];
return Array.from(el.options).map(o => ({ value: o.value || '', label: o.label || '' }));"#,
        );
        let options: Option<Vec<OptionItem>> = self.eval(script).await?;
        Ok(options.unwrap_or_default())
    }

    async fn select_by_value(&self, locator: &str, value: &str) -> Result<(), AutofillError> {
        let value_json = serde_json::to_string(value).unwrap_or_else(|_| "\"\"".into());
        let script = self.with_element(
            locator,
            &format!(
                r#"const target = {value_json};
const opt = Array.from(el.options).find(o => (o.value || '') === target);
if (!opt) return false;
el.value = opt.value;
el.dispatchEvent(new Event('change', {{ bubbles: true }}));
return true;"#
            ),
        );
        let ok: Option<bool> = self.eval(script).await?;
        match ok {
            Some(true) => Ok(()),
            _ => Err(AutofillError::Element(format!(
                "select by value failed for {locator}"
            ))),
        }
    }

    async fn select_by_label(&self, locator: &str, label: &str) -> Result<(), AutofillError> {
        let label_json = serde_json::to_string(label).unwrap_or_else(|_| "\"\"".into());
        let script = self.with_element(
            locator,
            &format!(
                r#"const target = {label_json};
const opt = Array.from(el.options).find(o => (o.label || '') === target);
if (!opt) return false;
el.value = opt.value;
el.dispatchEvent(new Event('change', {{ bubbles: true }}));
return true;"#
            ),
        );
        let ok: Option<bool> = self.eval(script).await?;
        match ok {
            Some(true) => Ok(()),
            _ => Err(AutofillError::Element(format!(
                "select by label failed for {locator}"
            ))),
        }
    }

    async fn selected_option(&self, locator: &str) -> Result<Option<OptionItem>, AutofillError> {
        let script = self.with_element(
            locator,
            r#"const opt = el.selectedOptions && el.selectedOptions.length ? el.selectedOptions[0] : null;
if (!opt) return null;
return { value: opt.value || '', label: opt.label || '' };"#,
        );
        self.eval(script).await
    }

    async fn radio_group(&self, locator: &str) -> Result<Vec<OptionItem>, AutofillError> {
        let script = self.with_element(
            locator,
            r#"const all = Array.from(document.querySelectorAll('input[type="radio"]'));
const name = el.getAttribute('name');
const group = name ? all.filter(r => r.getAttribute('name') === name) : [el];
const labelOf = (radio) => {
    const id = radio.id || '';
    if (id) {
        const labelEl = document.querySelector('label[for="' + CSS.escape(id) + '"]');
        if (labelEl && labelEl.innerText) return labelEl.innerText.trim();
    }
    const parentLabel = radio.closest('label');
    if (parentLabel && parentLabel.innerText) return parentLabel.innerText.trim();
    return '';
};
return group.map(radio => ({ value: radio.value || '', label: labelOf(radio) }));"#,
        );
        let options: Option<Vec<OptionItem>> = self.eval(script).await?;
        Ok(options.unwrap_or_default())
    }

    async fn radio_selected(&self, locator: &str) -> Result<Option<OptionItem>, AutofillError> {
        let script = self.with_element(
            locator,
            r#"const all = Array.from(document.querySelectorAll('input[type="radio"]'));
const name = el.getAttribute('name');
const group = name ? all.filter(r => r.getAttribute('name') === name) : [el];
const selected = group.find(r => r.checked);
if (!selected) return null;
const labelOf = (radio) => {
    const id = radio.id || '';
    if (id) {
        const labelEl = document.querySelector('label[for="' + CSS.escape(id) + '"]');
        if (labelEl && labelEl.innerText) return labelEl.innerText.trim();
    }
    const parentLabel = radio.closest('label');
    if (parentLabel && parentLabel.innerText) return parentLabel.innerText.trim();
    return '';
};
return { value: selected.value || '', label: labelOf(selected) };"#,
        );
        self.eval(script).await
    }

    async fn check_radio_value(&self, locator: &str, value: &str) -> Result<(), AutofillError> {
        let value_json = serde_json::to_string(value).unwrap_or_else(|_| "\"\"".into());
        let script = self.with_element(
            locator,
            &format!(
                r#"const all = Array.from(document.querySelectorAll('input[type="radio"]'));
const name = el.getAttribute('name');
const group = name ? all.filter(r => r.getAttribute('name') === name) : [el];
const target = {value_json};
const match = group.find(r => (r.value || '') === target);
if (!match) return false;
match.click();
return true;"#
            ),
        );
        let ok: Option<bool> = self.eval(script).await?;
        match ok {
            Some(true) => Ok(()),
            _ => Err(AutofillError::Element(format!(
                "radio select failed for {locator}"
            ))),
        }
    }

    async fn set_checked(&self, locator: &str) -> Result<(), AutofillError> {
        let script = self.with_element(
            locator,
            r#"if (!el.checked) el.click();
return Boolean(el.checked);"#,
        );
        let ok: Option<bool> = self.eval(script).await?;
        match ok {
            Some(true) => Ok(()),
            _ => Err(AutofillError::Element(format!("check failed for {locator}"))),
        }
    }

    async fn is_checked(&self, locator: &str) -> Result<bool, AutofillError> {
        let script = self.with_element(locator, "return Boolean(el.checked);");
        let checked: Option<bool> = self.eval(script).await?;
        Ok(checked.unwrap_or(false))
    }

    async fn current_url(&self) -> Result<String, AutofillError> {
        self.page
            .url()
            .await
            .map_err(|e| AutofillError::Session(e.to_string()))
            .map(|u| u.unwrap_or_default())
    }
}
