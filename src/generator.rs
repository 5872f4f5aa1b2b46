// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Synthetic value generators, looked up by the `type` tag of a field rule.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore, SeedableRng};

use crate::ast::Value;

/// Produces a replacement for a cell. `current` is the value being
/// replaced; most generators ignore it.
pub trait Generator: Send + Sync {
    fn generate(&self, current: &Value, rng: &mut dyn RngCore) -> Value;
}

impl<F> Generator for F
where
    F: Fn(&Value, &mut dyn RngCore) -> Value + Send + Sync,
{
    fn generate(&self, current: &Value, rng: &mut dyn RngCore) -> Value {
        self(current, rng)
    }
}

/// Always yields the same string.
#[derive(Debug, Clone)]
pub struct Constant(pub String);

impl Generator for Constant {
    fn generate(&self, _current: &Value, _rng: &mut dyn RngCore) -> Value {
        Value::SingleQuotedString(self.0.clone())
    }
}

enum Entropy {
    Thread,
    Seeded(Mutex<StdRng>),
}

/// Generators by tag. Built once, then only read.
pub struct Registry {
    generators: HashMap<String, Box<dyn Generator>>,
    entropy: Entropy,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut tags: Vec<&String> = self.generators.keys().collect();
        tags.sort();
        f.debug_struct("Registry")
            .field("tags", &tags)
            .field("seeded", &matches!(self.entropy, Entropy::Seeded(_)))
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::builtin()
    }
}

impl Registry {
    /// A registry with no generators.
    pub fn empty() -> Self {
        Registry {
            generators: HashMap::new(),
            entropy: Entropy::Thread,
        }
    }

    /// Every built-in generator.
    pub fn builtin() -> Self {
        Registry::empty()
            .register("username", username)
            .register("password", password)
            .register("email", email)
            .register("url", url)
            .register("name", name)
            .register("firstName", first_name)
            .register("lastName", last_name)
            .register("paragraph", paragraph)
            .register("ipv4", ipv4)
            .register("phoneNumber", phone_number)
            .register("companyName", company_name)
            .register("streetName", street_name)
            .register("city", city)
            .register("zip", zip)
            .register("state", state)
            .register("country", country)
            .register("userAgent", Constant(USER_AGENT.to_string()))
            .register("word", word)
            .register("redacted", Constant("REDACTED".to_string()))
    }

    /// Add (or replace) the generator for `tag`.
    pub fn register<G>(mut self, tag: &str, generator: G) -> Self
    where
        G: Generator + 'static,
    {
        self.generators.insert(tag.to_string(), Box::new(generator));
        self
    }

    /// Draw from a single RNG seeded with `seed` instead of per-thread RNGs.
    /// Output is reproducible as long as statements are generated in the
    /// same order, e.g. with a single worker.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.entropy = Entropy::Seeded(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.generators.contains_key(tag)
    }

    /// Generate a value for `tag`, or `None` if nothing is registered for it.
    pub fn generate(&self, tag: &str, current: &Value) -> Option<Value> {
        let generator = self.generators.get(tag)?;
        let value = match &self.entropy {
            Entropy::Thread => generator.generate(current, &mut rand::rng()),
            Entropy::Seeded(rng) => {
                let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
                generator.generate(current, &mut *rng)
            }
        };
        Some(value)
    }
}

const FIRST_NAMES: &[&str] = &[
    "Ada", "Albert", "Ardella", "Ashley", "Bernice", "Brooke", "Carlos", "Dana", "Eduardo",
    "Elena", "Hailey", "Ivan", "Jazmyn", "Kamren", "Kylie", "Lena", "Marco", "Michele", "Noah",
    "Priya", "Rosa", "Sherman", "Stephania", "Treva", "Watson", "Yuki",
];

const LAST_NAMES: &[&str] = &[
    "Barton", "Cremin", "Ebert", "Hamill", "Hayes", "Heaney", "Jenkins", "Jones", "Keeling",
    "Koelpin", "Nakamura", "Ohara", "Okeefe", "Pfannerstill", "Reynolds", "Rice", "Silva",
    "Smith", "Turner", "Weber",
];

const NAME_SUFFIXES: &[&str] = &["Jr.", "Sr.", "PhD", "MD", "DDS"];

const LOREM: &[&str] = &[
    "alias", "at", "consequatur", "dolor", "dolorum", "et", "est", "ipsum", "lorem", "magnam",
    "nostrum", "qui", "quia", "sit", "ut", "vel", "velit", "voluptatem", "voluptatum",
];

const DOMAIN_SUFFIXES: &[&str] = &["com", "net", "org", "info", "biz"];

const SAFE_EMAIL_DOMAINS: &[&str] = &["example.com", "example.net", "example.org"];

const COMPANY_SUFFIXES: &[&str] = &["Inc", "LLC", "Group", "and Sons", "Ltd"];

const STREET_SUFFIXES: &[&str] = &["Street", "Avenue", "Road", "Lane", "Way", "Court"];

const CITIES: &[&str] = &[
    "Springfield", "Riverton", "Lakewood", "Fairview", "Greenville", "Madison", "Georgetown",
    "Franklin", "Clinton", "Salem",
];

const STATES: &[&str] = &[
    "Alabama", "California", "Colorado", "Florida", "Illinois", "Nevada", "Ohio", "Oregon",
    "Texas", "Vermont",
];

const COUNTRIES: &[&str] = &[
    "Argentina", "Australia", "Brazil", "Canada", "Germany", "Japan", "Kenya", "Norway", "Portugal",
    "Spain",
];

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_2) AppleWebKit/601.3.9 (KHTML, like Gecko) Version/9.0.2 Safari/601.3.9";

const PASSWORD_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn pick(list: &'static [&'static str], rng: &mut dyn RngCore) -> &'static str {
    list.choose(rng).copied().unwrap_or_default()
}

fn username_text(rng: &mut dyn RngCore) -> String {
    let first = pick(FIRST_NAMES, rng).to_lowercase();
    let last = pick(LAST_NAMES, rng).to_lowercase();
    match rng.random_range(0..3) {
        0 => first,
        1 => format!("{}.{}", first, last),
        _ => format!("{}_{}", first, last),
    }
}

fn username(_: &Value, rng: &mut dyn RngCore) -> Value {
    Value::from(username_text(rng))
}

fn password(_: &Value, rng: &mut dyn RngCore) -> Value {
    let len = rng.random_range(8..=14);
    let password: String = (0..len)
        .map(|_| char::from(PASSWORD_CHARS[rng.random_range(0..PASSWORD_CHARS.len())]))
        .collect();
    Value::from(password)
}

fn email(_: &Value, rng: &mut dyn RngCore) -> Value {
    let user = username_text(rng);
    Value::from(format!("{}@{}", user, pick(SAFE_EMAIL_DOMAINS, rng)))
}

fn url(_: &Value, rng: &mut dyn RngCore) -> Value {
    let host = pick(LAST_NAMES, rng).to_lowercase();
    let suffix = pick(DOMAIN_SUFFIXES, rng);
    let path = username_text(rng);
    Value::from(format!("http://{}.{}/{}", host, suffix, path))
}

fn name(_: &Value, rng: &mut dyn RngCore) -> Value {
    let first = pick(FIRST_NAMES, rng);
    let last = pick(LAST_NAMES, rng);
    if rng.random_bool(0.1) {
        Value::from(format!("{} {} {}", first, last, pick(NAME_SUFFIXES, rng)))
    } else {
        Value::from(format!("{} {}", first, last))
    }
}

fn first_name(_: &Value, rng: &mut dyn RngCore) -> Value {
    Value::from(pick(FIRST_NAMES, rng))
}

fn last_name(_: &Value, rng: &mut dyn RngCore) -> Value {
    Value::from(pick(LAST_NAMES, rng))
}

fn paragraph(_: &Value, rng: &mut dyn RngCore) -> Value {
    let words = rng.random_range(3..=6);
    let mut sentence = (0..words)
        .map(|_| pick(LOREM, rng))
        .collect::<Vec<_>>()
        .join(" ");
    if let Some(first) = sentence.get(..1) {
        let capital = first.to_uppercase();
        sentence.replace_range(..1, &capital);
    }
    sentence.push('.');
    Value::from(sentence)
}

fn ipv4(_: &Value, rng: &mut dyn RngCore) -> Value {
    let octets: [u8; 4] = rng.random();
    Value::from(format!(
        "{}.{}.{}.{}",
        octets[0], octets[1], octets[2], octets[3]
    ))
}

fn phone_number(_: &Value, rng: &mut dyn RngCore) -> Value {
    let digits = rng.random_range(7..12);
    let number: String = (0..digits)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect();
    Value::from(format!("0{}", number))
}

fn company_name(_: &Value, rng: &mut dyn RngCore) -> Value {
    Value::from(format!(
        "{} {}",
        pick(LAST_NAMES, rng),
        pick(COMPANY_SUFFIXES, rng)
    ))
}

fn street_name(_: &Value, rng: &mut dyn RngCore) -> Value {
    Value::from(format!(
        "{} {}",
        pick(LAST_NAMES, rng),
        pick(STREET_SUFFIXES, rng)
    ))
}

fn city(_: &Value, rng: &mut dyn RngCore) -> Value {
    Value::from(pick(CITIES, rng))
}

fn zip(_: &Value, rng: &mut dyn RngCore) -> Value {
    Value::from(format!("{:05}", rng.random_range(0..100_000u32)))
}

fn state(_: &Value, rng: &mut dyn RngCore) -> Value {
    Value::from(pick(STATES, rng))
}

fn country(_: &Value, rng: &mut dyn RngCore) -> Value {
    Value::from(pick(COUNTRIES, rng))
}

fn word(_: &Value, rng: &mut dyn RngCore) -> Value {
    Value::from(pick(LOREM, rng))
}
