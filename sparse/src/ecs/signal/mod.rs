//! Listener lists for storage lifecycle notifications.
//!
//! Every component type in a [`World`] has three [`Signal`]s bundled in [`Hooks`]:
//!
//! | Signal | Fired |
//! |--------|-------|
//! | `construct` | after a value was emplaced (groups are updated first) |
//! | `update` | after a value was patched or replaced |
//! | `destroy` | before a value is erased (groups are updated after), the value is still readable |
//!
//! Listeners receive the world itself and the entity. They may freely mutate the world, including
//! raising nested notifications of the same signal, which reach every connected listener again
//! before the outer dispatch moves on. Listeners connected during a dispatch only take part in the
//! next one; listeners disconnected during a dispatch are skipped if they have not run yet.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut world = World::new();
//!
//! let conn = world.on_construct::<Health>(|world, entity| {
//!     world.emplace(entity, Regen(1));
//! });
//!
//! world.disconnect::<Health>(conn);
//! ```

use std::rc::Rc;

use crate::ecs::{entity::Entity, world::World};

/// A world listener: called with the world and the entity the notification is about.
///
/// Listeners may be reentered by nested notifications, so they take `&self`. State they carry goes
/// behind a `Cell` or `RefCell`.
pub type Listener = dyn Fn(&mut World, Entity);

/// Handle to a connected listener, used to disconnect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Connection(u32);

impl Connection {
    #[inline]
    pub const fn id(&self) -> u32 {
        self.0
    }
}

/// An ordered list of listeners. Listeners run in connection order.
///
/// Listeners are shared, so a dispatch can hold on to them while the list itself changes.
pub struct Signal<F: ?Sized> {
    listeners: Vec<(Connection, Rc<F>)>,
    next: u32,
}

impl<F: ?Sized> Signal<F> {
    pub const fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next: 0,
        }
    }

    /// Append a listener.
    pub fn connect(&mut self, listener: Box<F>) -> Connection {
        let conn = Connection(self.next);
        self.next += 1;
        self.listeners.push((conn, Rc::from(listener)));
        conn
    }

    /// Append a listener under an id handed out by the caller.
    pub(crate) fn connect_as(&mut self, conn: Connection, listener: Box<F>) {
        self.listeners.push((conn, Rc::from(listener)));
    }

    /// Remove a listener. Returns `false` if it is not connected.
    pub fn disconnect(&mut self, conn: Connection) -> bool {
        match self.listeners.iter().position(|(id, _)| *id == conn) {
            Some(pos) => {
                self.listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Returns `true` if `conn` is connected to this signal.
    pub fn contains(&self, conn: Connection) -> bool {
        self.listeners.iter().any(|(id, _)| *id == conn)
    }

    /// Iterate the listeners in connection order.
    pub fn listeners(&self) -> impl Iterator<Item = &F> + '_ {
        self.listeners.iter().map(|(_, listener)| &**listener)
    }

    /// The listeners connected right now, for a dispatch that may change the list as it goes.
    pub(crate) fn snapshot(&self) -> Vec<(Connection, Rc<F>)> {
        self.listeners.clone()
    }
}

impl<F: ?Sized> Default for Signal<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> std::fmt::Debug for Signal<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// The lifecycle points a listener can be connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Construct,
    Update,
    Destroy,
}

/// The lifecycle signals of one component type.
///
/// Connections are numbered across all three signals, so a [`Connection`] alone identifies the
/// listener to disconnect.
#[derive(Debug, Default)]
pub struct Hooks {
    construct: Signal<Listener>,
    update: Signal<Listener>,
    destroy: Signal<Listener>,
    next: u32,
}

impl Hooks {
    #[inline]
    pub fn signal(&self, event: Lifecycle) -> &Signal<Listener> {
        match event {
            Lifecycle::Construct => &self.construct,
            Lifecycle::Update => &self.update,
            Lifecycle::Destroy => &self.destroy,
        }
    }

    #[inline]
    pub(crate) fn signal_mut(&mut self, event: Lifecycle) -> &mut Signal<Listener> {
        match event {
            Lifecycle::Construct => &mut self.construct,
            Lifecycle::Update => &mut self.update,
            Lifecycle::Destroy => &mut self.destroy,
        }
    }

    /// Connect a listener to one of the signals.
    pub fn connect(&mut self, event: Lifecycle, listener: Box<Listener>) -> Connection {
        let conn = Connection(self.next);
        self.next += 1;
        self.signal_mut(event).connect_as(conn, listener);
        conn
    }

    /// Disconnect a listener from whichever signal holds it.
    pub fn disconnect(&mut self, conn: Connection) -> bool {
        self.construct.disconnect(conn)
            || self.update.disconnect(conn)
            || self.destroy.disconnect(conn)
    }

    /// Returns `true` if no listener is connected to any of the signals.
    pub fn is_empty(&self) -> bool {
        self.construct.is_empty() && self.update.is_empty() && self.destroy.is_empty()
    }
}
