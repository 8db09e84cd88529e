use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::Result;
use crate::layer::{Layer, Resources};

/// Resource name under which [`DirectivesLayer`] shares its context.
pub const CONFIGURATION_CONTEXT: &str = "configurationContext";

/// A set of configuration directives declared by one package's meta file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveSchema {
    pub package: &'static str,
    pub file: &'static str,
    pub namespace: &'static str,
    pub directives: &'static [&'static str],
}

/// The `permission` directive.
pub const SECURITY_DIRECTIVES: DirectiveSchema = DirectiveSchema {
    package: "security",
    file: "meta.conf",
    namespace: "core",
    directives: &["permission"],
};

/// Browser views, pages, resources and menus; viewlets are not included.
pub const BROWSER_DIRECTIVES: DirectiveSchema = DirectiveSchema {
    package: "publisher",
    file: "meta.conf",
    namespace: "browser",
    directives: &[
        "page",
        "pages",
        "view",
        "defaultView",
        "resource",
        "resourceDirectory",
        "icon",
        "menu",
        "menuItem",
        "menuItems",
        "addMenuItem",
        "defaultSkin",
    ],
};

/// Accumulates loaded directive schemas. Loading the same schema twice
/// records it twice; nothing is ever unloaded.
#[derive(Debug, Default)]
pub struct ConfigurationContext {
    loaded: Vec<DirectiveSchema>,
    directives: IndexMap<(String, String), &'static str>,
}

impl ConfigurationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, schema: &DirectiveSchema) {
        debug!(package = schema.package, file = schema.file, "loading directive schema");
        for directive in schema.directives {
            self.directives
                .insert((schema.namespace.to_string(), directive.to_string()), schema.package);
        }
        self.loaded.push(*schema);
    }

    pub fn loaded(&self) -> &[DirectiveSchema] {
        &self.loaded
    }

    pub fn load_count(&self, schema: &DirectiveSchema) -> usize {
        self.loaded.iter().filter(|s| *s == schema).count()
    }

    pub fn has_directive(&self, namespace: &str, name: &str) -> bool {
        self.directives
            .contains_key(&(namespace.to_string(), name.to_string()))
    }
}

/// Base layer owning the shared [`ConfigurationContext`].
pub struct DirectivesLayer;

impl Layer for DirectivesLayer {
    fn name(&self) -> &str {
        "directives"
    }

    fn set_up(&self, resources: &mut Resources) -> Result<()> {
        resources.insert(CONFIGURATION_CONTEXT, ConfigurationContext::new());
        Ok(())
    }

    fn tear_down(&self, resources: &mut Resources) -> Result<()> {
        resources.remove(CONFIGURATION_CONTEXT);
        Ok(())
    }
}

/// Loads the security and browser directive schemas into the shared
/// context. Tear-down leaves them loaded, so repeated set-ups against the
/// same context accumulate registrations.
pub struct PublisherDirectives {
    base: Rc<dyn Layer>,
}

impl Default for PublisherDirectives {
    fn default() -> Self {
        Self::new()
    }
}

impl PublisherDirectives {
    pub fn new() -> Self {
        Self::with_base(Rc::new(DirectivesLayer))
    }

    /// Shares an existing base layer instance with other dependents.
    pub fn with_base(base: Rc<dyn Layer>) -> Self {
        Self { base }
    }
}

impl Layer for PublisherDirectives {
    fn name(&self) -> &str {
        "publisher-directives"
    }

    fn bases(&self) -> Vec<Rc<dyn Layer>> {
        vec![Rc::clone(&self.base)]
    }

    fn set_up(&self, resources: &mut Resources) -> Result<()> {
        let context = resources.get_mut::<ConfigurationContext>(CONFIGURATION_CONTEXT)?;
        context.load(&SECURITY_DIRECTIVES);
        context.load(&BROWSER_DIRECTIVES);
        info!(loaded = context.loaded().len(), "publisher directives registered");
        Ok(())
    }

    // Directives cannot be unloaded from the context
    fn tear_down(&self, _resources: &mut Resources) -> Result<()> {
        Ok(())
    }
}
