use minijinja::Environment;

use crate::session::SessionView;

const CHAT_PAGE: &str = "chat.html";
const CHAT_TEMPLATE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/chat.html"));

/// Renders the chat page from a [`SessionView`]. Output is HTML-escaped.
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(CHAT_PAGE, CHAT_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render(&self, view: &SessionView) -> Result<String, minijinja::Error> {
        self.env.get_template(CHAT_PAGE)?.render(view)
    }
}
