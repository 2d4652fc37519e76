// Stateful fake of the web console for integration tests.
//
// One wiremock responder routes every request by path, keeps the config
// lists in memory and behaves like the real pages closely enough for the
// client: tokens in the page head, a login form, `<pre>` script output,
// input-errors boxes and position-indexed edits and deletes.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use secrecy::SecretString;
use serde_json::{Map, Value, json};
use url::Url;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use pfwarden_api::{Client, ClientOptions, Credentials, RetryPolicy};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "pfsense";
const TOKEN_NAME: &str = "__csrf_magic";

// ── State ───────────────────────────────────────────────────────────

#[derive(Default)]
struct State {
    next_token: u64,
    tokens: HashSet<String>,
    logged_in: bool,
    aliases: Vec<Value>,
    domain_overrides: Vec<Value>,
    hosts: Vec<Value>,
    static_maps: HashMap<String, Vec<Value>>,
    /// Every mutating page post, in arrival order.
    writes: Vec<String>,
    /// Resource area touched by each request, in arrival order.
    areas: Vec<&'static str>,
    applied: Vec<String>,
    script_output: Option<String>,
    reject_next_save: Option<String>,
}

impl State {
    fn issue_token(&mut self) -> String {
        self.next_token += 1;
        let token = format!("sid:{:08x},1700000000", self.next_token);
        self.tokens.insert(token.clone());
        token
    }

    fn page(&mut self, body: &str) -> ResponseTemplate {
        let token = self.issue_token();
        ResponseTemplate::new(200).set_body_string(page(&token, body))
    }

    fn login_page(&mut self, failed: bool) -> ResponseTemplate {
        let notice = if failed {
            r#"<div class="alert alert-danger">Username or Password incorrect</div>"#
        } else {
            ""
        };
        self.page(&format!(
            r#"{notice}<form method="post"><input type="text" name="usernamefld" id="usernamefld"><input type="password" name="passwordfld"><button name="login" value="Sign In">Sign In</button></form>"#
        ))
    }
}

/// Full HTML page carrying `token` the way the console's head script does.
pub fn page(token: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>pfSense</title><script type="text/javascript">var csrfMagicToken = "{token}";var csrfMagicName = "{TOKEN_NAME}";</script></head><body>{body}</body></html>"#
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ── Responder ───────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct FakeConsole {
    state: Arc<Mutex<State>>,
    delay: Option<Duration>,
}

impl FakeConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn mount(&self, server: &MockServer) {
        Mock::given(any())
            .respond_with(self.clone())
            .mount(server)
            .await;
    }

    pub fn seed_aliases(&self, aliases: Value) {
        self.state.lock().unwrap().aliases = as_list(aliases);
    }

    pub fn seed_domain_overrides(&self, records: Value) {
        self.state.lock().unwrap().domain_overrides = as_list(records);
    }

    pub fn seed_hosts(&self, records: Value) {
        self.state.lock().unwrap().hosts = as_list(records);
    }

    pub fn seed_static_maps(&self, interface: &str, records: Value) {
        self.state
            .lock()
            .unwrap()
            .static_maps
            .insert(interface.to_owned(), as_list(records));
    }

    pub fn aliases(&self) -> Vec<Value> {
        self.state.lock().unwrap().aliases.clone()
    }

    pub fn domain_overrides(&self) -> Vec<Value> {
        self.state.lock().unwrap().domain_overrides.clone()
    }

    pub fn static_maps(&self, interface: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .static_maps
            .get(interface)
            .cloned()
            .unwrap_or_default()
    }

    pub fn writes(&self) -> Vec<String> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn areas(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().areas.clone()
    }

    pub fn applied(&self) -> Vec<String> {
        self.state.lock().unwrap().applied.clone()
    }

    /// Make the script console print `output` instead of config JSON.
    pub fn set_script_output(&self, output: &str) {
        self.state.lock().unwrap().script_output = Some(output.to_owned());
    }

    /// Answer the next save with an input-errors box and change nothing.
    pub fn reject_next_save(&self, message: &str) {
        self.state.lock().unwrap().reject_next_save = Some(message.to_owned());
    }

    /// Forget every token handed out so far, as a console restart would.
    pub fn revoke_tokens(&self) {
        self.state.lock().unwrap().tokens.clear();
    }

    /// Drop the login, so every page turns into the login form.
    pub fn expire_session(&self) {
        self.state.lock().unwrap().logged_in = false;
    }

    fn handle(&self, request: &Request) -> ResponseTemplate {
        let form: HashMap<String, String> = url::form_urlencoded::parse(&request.body)
            .into_owned()
            .collect();
        let query: HashMap<String, String> = request.url.query_pairs().into_owned().collect();
        let path = request.url.path();
        let is_post = request.method.as_str() == "POST";

        let mut state = self.state.lock().unwrap();

        if is_post {
            let token_ok = form
                .get(TOKEN_NAME)
                .is_some_and(|token| state.tokens.contains(token));
            if !token_ok {
                return ResponseTemplate::new(403).set_body_string(
                    "<html><body><p>CSRF check failed. Your form session may have expired, or you may not have cookies enabled.</p></body></html>",
                );
            }
        }

        if path == "/" {
            if !is_post {
                return if state.logged_in {
                    state.page("<h1>Dashboard</h1>")
                } else {
                    state.login_page(false)
                };
            }
            let valid = form.get("usernamefld").map(String::as_str) == Some(USERNAME)
                && form.get("passwordfld").map(String::as_str) == Some(PASSWORD);
            state.logged_in = valid;
            return if valid {
                state.page("<h1>Dashboard</h1>")
            } else {
                state.login_page(true)
            };
        }

        if path == "/index.php" && query.contains_key("logout") {
            state.logged_in = false;
            return state.login_page(false);
        }

        if !state.logged_in {
            return state.login_page(false);
        }

        match path {
            "/diag_command.php" => script(&mut state, &form),
            "/firewall_aliases_edit.php" => {
                state.areas.push("aliases");
                save(&mut state, path, &query, |s| &mut s.aliases, alias_record(&form))
            }
            "/firewall_aliases.php" => {
                state.areas.push("aliases");
                delete(&mut state, path, &query, |s| &mut s.aliases)
            }
            "/services_unbound_domainoverride_edit.php" => {
                state.areas.push("dns");
                save(
                    &mut state,
                    path,
                    &query,
                    |s| &mut s.domain_overrides,
                    domain_override_record(&form),
                )
            }
            "/services_unbound_host_edit.php" => {
                state.areas.push("dns");
                save(&mut state, path, &query, |s| &mut s.hosts, host_record(&form))
            }
            "/services_unbound.php" => {
                state.areas.push("dns");
                if form.contains_key("apply") {
                    state.applied.push("dns".into());
                    return state.page("<p>The changes have been applied successfully.</p>");
                }
                match form.get("type").map(String::as_str) {
                    Some("doverride") => delete(&mut state, path, &form, |s| &mut s.domain_overrides),
                    Some("host") => delete(&mut state, path, &form, |s| &mut s.hosts),
                    _ => state.page("<p>DNS Resolver</p>"),
                }
            }
            "/services_dhcp_edit.php" => {
                state.areas.push("dhcp");
                let interface = query.get("if").cloned().unwrap_or_default();
                let record = static_map_record(&form);
                save(
                    &mut state,
                    path,
                    &query,
                    move |s| s.static_maps.entry(interface).or_default(),
                    record,
                )
            }
            "/services_dhcp.php" => {
                state.areas.push("dhcp");
                let interface = query.get("if").cloned().unwrap_or_default();
                if form.contains_key("apply") {
                    state.applied.push(format!("dhcp:{interface}"));
                    return state.page("<p>The changes have been applied successfully.</p>");
                }
                delete(&mut state, path, &query, move |s| {
                    s.static_maps.entry(interface).or_default()
                })
            }
            "/status_filter_reload.php" => {
                state.areas.push("aliases");
                state.applied.push("filter".into());
                state.page("<p>The filter rules are being reloaded.</p>")
            }
            _ => ResponseTemplate::new(404).set_body_string("Not Found"),
        }
    }
}

impl Respond for FakeConsole {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let response = self.handle(request);
        match self.delay {
            Some(delay) => response.set_delay(delay),
            None => response,
        }
    }
}

fn as_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

// ── Pages ───────────────────────────────────────────────────────────

fn script(state: &mut State, form: &HashMap<String, String>) -> ResponseTemplate {
    let command = form.get("txtPHPCommand").cloned().unwrap_or_default();

    let output = if let Some(output) = state.script_output.clone() {
        output
    } else if let Some(path) = config_path(&command) {
        state.areas.push(area_of(&path));
        lookup(state, &path).to_string()
    } else {
        String::new()
    };

    state.page(&format!(
        r#"<div class="panel-body"><pre>{}</pre></div>"#,
        escape(&output)
    ))
}

fn config_path(command: &str) -> Option<String> {
    let start = command.find("config_get_path('")? + "config_get_path('".len();
    let end = command[start..].find('\'')? + start;
    Some(command[start..end].to_owned())
}

fn area_of(path: &str) -> &'static str {
    if path.starts_with("aliases") {
        "aliases"
    } else if path.starts_with("unbound") {
        "dns"
    } else if path.starts_with("dhcpd") {
        "dhcp"
    } else {
        "other"
    }
}

fn lookup(state: &State, path: &str) -> Value {
    let list = |items: &Vec<Value>| {
        if items.is_empty() {
            Value::Null
        } else {
            Value::Array(items.clone())
        }
    };
    match path.split('/').collect::<Vec<_>>().as_slice() {
        ["aliases", "alias"] => list(&state.aliases),
        ["unbound", "domainoverrides"] => list(&state.domain_overrides),
        ["unbound", "hosts"] => list(&state.hosts),
        ["dhcpd", interface, "staticmap"] => state
            .static_maps
            .get(*interface)
            .map_or(Value::Null, list),
        _ => Value::Null,
    }
}

fn input_errors(state: &mut State, message: &str) -> ResponseTemplate {
    state.page(&format!(
        r#"<div class="alert alert-danger input-errors"><p>The following input errors were detected:</p><ul><li>{}</li></ul></div>"#,
        escape(message)
    ))
}

fn position(params: &HashMap<String, String>) -> Option<usize> {
    params.get("id").and_then(|id| id.parse().ok())
}

fn save(
    state: &mut State,
    path: &str,
    query: &HashMap<String, String>,
    list: impl FnOnce(&mut State) -> &mut Vec<Value>,
    record: Value,
) -> ResponseTemplate {
    if let Some(message) = state.reject_next_save.take() {
        return input_errors(state, &message);
    }
    state.writes.push(path.to_owned());

    let items = list(state);
    match position(query) {
        Some(index) if index < items.len() => items[index] = record,
        Some(_) => return ResponseTemplate::new(200).set_body_string("<p>bad id</p>"),
        None => items.push(record),
    }
    state.page("<p>saved</p>")
}

fn delete(
    state: &mut State,
    path: &str,
    params: &HashMap<String, String>,
    list: impl FnOnce(&mut State) -> &mut Vec<Value>,
) -> ResponseTemplate {
    state.writes.push(path.to_owned());
    let items = list(state);
    if let Some(index) = position(params).filter(|i| *i < items.len()) {
        items.remove(index);
    }
    state.page("<p>deleted</p>")
}

// ── Form → config records ───────────────────────────────────────────

fn rows(form: &HashMap<String, String>, prefix: &str) -> Vec<String> {
    (0..)
        .map_while(|i| form.get(&format!("{prefix}{i}")).cloned())
        .collect()
}

fn alias_record(form: &HashMap<String, String>) -> Value {
    let addresses: Vec<String> = rows(form, "address")
        .into_iter()
        .enumerate()
        .map(|(i, address)| match form.get(&format!("address_subnet{i}")) {
            Some(subnet) if !subnet.is_empty() => format!("{address}/{subnet}"),
            _ => address,
        })
        .collect();
    json!({
        "name": form.get("name"),
        "type": form.get("type"),
        "descr": form.get("descr"),
        "address": addresses.join(" "),
        "detail": rows(form, "detail").join("||"),
    })
}

fn domain_override_record(form: &HashMap<String, String>) -> Value {
    let mut record = Map::new();
    record.insert("domain".into(), json!(form.get("domain")));
    record.insert("ip".into(), json!(form.get("ip")));
    record.insert("descr".into(), json!(form.get("descr")));
    record.insert("tls_hostname".into(), json!(form.get("tls_hostname")));
    if form.contains_key("forward_tls_upstream") {
        record.insert("forward_tls_upstream".into(), json!(""));
    }
    Value::Object(record)
}

fn host_record(form: &HashMap<String, String>) -> Value {
    let hosts = rows(form, "aliashost");
    let domains = rows(form, "aliasdomain");
    let descriptions = rows(form, "aliasdescription");
    let aliases: Vec<Value> = hosts
        .iter()
        .zip(&domains)
        .zip(descriptions.iter().chain(std::iter::repeat(&String::new())))
        .map(|((host, domain), description)| {
            json!({ "host": host, "domain": domain, "description": description })
        })
        .collect();

    json!({
        "host": form.get("host"),
        "domain": form.get("domain"),
        "ip": form.get("ip"),
        "descr": form.get("descr"),
        "aliases": if aliases.is_empty() { json!("") } else { json!({ "item": aliases }) },
    })
}

fn static_map_record(form: &HashMap<String, String>) -> Value {
    let mut record = Map::new();
    for (field, key) in [
        ("mac", "mac"),
        ("cid", "cid"),
        ("ipaddr", "ipaddr"),
        ("hostname", "hostname"),
        ("descr", "descr"),
        ("gateway", "gateway"),
        ("domain", "domain"),
        ("domainsearchlist", "domainsearchlist"),
        ("defaultleasetime", "defaultleasetime"),
        ("maxleasetime", "maxleasetime"),
    ] {
        record.insert(key.into(), json!(form.get(field).cloned().unwrap_or_default()));
    }
    if form.contains_key("arp_table_static_entry") {
        record.insert("arp_table_static_entry".into(), json!(""));
    }
    let wins = rows(form, "winsserver");
    if !wins.is_empty() {
        record.insert("winsserver".into(), json!(wins));
    }
    let dns = rows(form, "dnsserver");
    if !dns.is_empty() {
        record.insert("dnsserver".into(), json!(dns));
    }
    Value::Object(record)
}

// ── Client helpers ──────────────────────────────────────────────────

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        min_wait: Duration::from_millis(1),
        max_wait: Duration::from_millis(2),
        max_attempts: 3,
    }
}

pub fn options(server: &MockServer) -> ClientOptions {
    ClientOptions::new(
        Url::parse(&server.uri()).unwrap(),
        Credentials::new(USERNAME, SecretString::from(PASSWORD.to_string())),
    )
    .with_retry(fast_retry())
}

/// A running fake console plus a client already logged in to it.
pub async fn setup() -> (MockServer, FakeConsole, Client) {
    setup_with(FakeConsole::new(), |opts| opts).await
}

pub async fn setup_with(
    fake: FakeConsole,
    configure: impl FnOnce(ClientOptions) -> ClientOptions,
) -> (MockServer, FakeConsole, Client) {
    let server = MockServer::start().await;
    fake.mount(&server).await;
    let client = Client::connect(configure(options(&server))).await.unwrap();
    (server, fake, client)
}
