//! Plugins woven into tree chains

#![allow(clippy::unwrap_used, clippy::panic)]

use arbor_core::{Entity, Error, Result, Storage};
use arbor_crypto::NoCrypto;
use arbor_db::MemDb;
use arbor_plugin::{Action, Plugin, PluginManager, PluginOpts, PluginResult};
use arbor_tree::{CancelToken, RefContext, Tree, TreeBuilder};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Records every action it sees and stamps created entities
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Action>>,
    refuse: Option<Action>,
}

impl Plugin for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) {}

    fn process_entity(&self, opts: &PluginOpts) -> Result<PluginResult> {
        self.seen.lock().push(opts.action);
        if self.refuse == Some(opts.action) {
            return Err(Error::plugin("recorder", format!("{} refused", opts.action)));
        }
        let mut entity: Entity = opts.entity.clone().unwrap();
        if opts.action == Action::EntityCreate {
            entity.meta = Some("provisioned".into());
        }
        Ok(PluginResult {
            entity: Some(entity),
            group: None,
        })
    }

    fn process_group(&self, opts: &PluginOpts) -> Result<PluginResult> {
        self.seen.lock().push(opts.action);
        Ok(opts.passthrough())
    }
}

/// Rewrites the ID of every entity it is handed
struct Renamer {
    to: &'static str,
}

impl Plugin for Renamer {
    fn name(&self) -> &str {
        "renamer"
    }

    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) {}

    fn process_entity(&self, opts: &PluginOpts) -> Result<PluginResult> {
        let mut entity: Entity = opts.entity.clone().unwrap();
        entity.id = self.to.to_string();
        entity.secret = None;
        Ok(PluginResult {
            entity: Some(entity),
            group: None,
        })
    }

    fn process_group(&self, opts: &PluginOpts) -> Result<PluginResult> {
        Ok(opts.passthrough())
    }
}

/// Cancels the request it is part of
struct Canceller {
    cancel: CancelToken,
}

impl Plugin for Canceller {
    fn name(&self) -> &str {
        "canceller"
    }

    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) {}

    fn process_entity(&self, opts: &PluginOpts) -> Result<PluginResult> {
        self.cancel.cancel();
        Ok(opts.passthrough())
    }

    fn process_group(&self, opts: &PluginOpts) -> Result<PluginResult> {
        self.cancel.cancel();
        Ok(opts.passthrough())
    }
}

fn setup(plugins: &[Arc<dyn Plugin>]) -> (Arc<MemDb>, Arc<PluginManager>, Tree) {
    let db = Arc::new(MemDb::new());
    let manager = Arc::new(PluginManager::new(Duration::from_secs(2)));
    for plugin in plugins {
        manager.add_plugin(Arc::clone(plugin)).unwrap();
    }

    let mut builder = TreeBuilder::new(RefContext::new(db.clone(), Arc::new(NoCrypto))).unwrap();
    manager.register_entity_hooks(builder.entity_hooks_mut()).unwrap();
    manager.register_group_hooks(builder.group_hooks_mut()).unwrap();
    let tree = builder
        .entity_directives(manager.entity_chain_directives())
        .group_directives(manager.group_chain_directives())
        .build()
        .unwrap();
    (db, manager, tree)
}

#[test]
fn test_plugin_output_is_persisted() {
    let recorder = Arc::new(Recorder::default());
    let (db, manager, tree) = setup(&[recorder.clone()]);

    tree.new_entity("alice", -1, None).unwrap();
    assert_eq!(
        db.load_entity("alice").unwrap().meta.as_deref(),
        Some("provisioned")
    );

    tree.lock_entity("alice").unwrap();
    tree.new_group("ops", "Ops", None, -1).unwrap();
    tree.add_entity_to_group("alice", "ops").unwrap();
    tree.delete_entity("alice").unwrap();

    assert_eq!(
        *recorder.seen.lock(),
        vec![
            Action::EntityCreate,
            Action::EntityLock,
            Action::GroupCreate,
            Action::EntityUpdate,
            Action::EntityDestroy,
        ]
    );
    assert_eq!(
        tree.entity_chains().hook_names("LOCK").unwrap(),
        vec!["load-entity", "lock-entity", "plugin-entity-lock"]
    );
    manager.shutdown();
}

#[test]
fn test_plugin_error_aborts_chain() {
    let recorder = Arc::new(Recorder {
        refuse: Some(Action::EntityLock),
        ..Recorder::default()
    });
    let (db, _manager, tree) = setup(&[recorder]);

    tree.new_entity("alice", -1, None).unwrap();
    let err = tree.lock_entity("alice").unwrap_err();
    assert!(matches!(err, Error::Plugin { .. }));
    assert!(!db.load_entity("alice").unwrap().locked);
}

#[test]
fn test_plugin_cannot_rename_created_entity() {
    let (db, _manager, tree) = setup(&[Arc::new(Renamer { to: "alice" })]);
    db.save_entity(&Entity {
        secret: Some("alice-secret".into()),
        ..Entity::new("alice")
    })
    .unwrap();

    let err = tree.new_entity("bob", -1, Some("pw")).unwrap_err();
    assert!(matches!(err, Error::ChainConfig(_)));
    assert_eq!(
        db.load_entity("alice").unwrap().secret.as_deref(),
        Some("alice-secret")
    );
    assert_eq!(db.discover_entity_ids().unwrap(), vec!["alice"]);
}

#[test]
fn test_cancel_between_plugins_stops_create() {
    let cancel = CancelToken::new();
    let recorder = Arc::new(Recorder::default());
    let (db, _manager, tree) = setup(&[
        Arc::new(Canceller {
            cancel: cancel.clone(),
        }),
        recorder.clone(),
    ]);

    let err = tree.create_entity("alice", -1, None, &cancel).unwrap_err();
    assert!(matches!(err, Error::Cancelled(ref at) if at == "plugin 'recorder'"));
    assert!(recorder.seen.lock().is_empty());
    assert!(db.discover_entity_ids().unwrap().is_empty());
}
