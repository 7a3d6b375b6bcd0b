use serde_json::Value;
use std::rc::Rc;

use crate::runtime::Runtime;

/// Something that extends a [`Runtime`] once.
pub trait Plugin {
    fn install(&self, runtime: &mut Runtime, args: &[Value]);
}

impl<F> Plugin for F
where
    F: Fn(&mut Runtime, &[Value]),
{
    fn install(&self, runtime: &mut Runtime, args: &[Value]) {
        self(runtime, args)
    }
}

/// Installed plugins, compared by identity.
#[derive(Default)]
pub struct PluginRegistry {
    installed: Vec<Rc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn contains(&self, plugin: &Rc<dyn Plugin>) -> bool {
        let target = Rc::as_ptr(plugin) as *const ();
        self.installed
            .iter()
            .any(|p| Rc::as_ptr(p) as *const () == target)
    }

    pub fn register(&mut self, plugin: Rc<dyn Plugin>) {
        if !self.contains(&plugin) {
            self.installed.push(plugin);
        }
    }

    pub fn len(&self) -> usize {
        self.installed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }
}
