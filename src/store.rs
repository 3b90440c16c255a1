//! The runtime object model.
//!
//! Live functions, tables, memories, and globals are arena entries owned by a
//! [`Store`], addressed by stable index handles. A module-instantiation layer
//! above this crate decides what goes into the store; the execution core
//! borrows entries for invocation, type-checking, and fault attribution.

use crate::compiler::VMFunctionBody;
use crate::types::{ExternType, FuncType, GlobalType, MemoryType, TableType};
use crate::values::Val;
use cranelift_entity::{entity_impl, PrimaryMap};
use std::sync::atomic::{AtomicU64, Ordering::SeqCst};

/// Index of a function in a [`Store`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct FuncId(u32);
entity_impl!(FuncId);

/// Index of a table in a [`Store`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct TableId(u32);
entity_impl!(TableId);

/// Index of a memory in a [`Store`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct MemoryId(u32);
entity_impl!(MemoryId);

/// Index of a global in a [`Store`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct GlobalId(u32);
entity_impl!(GlobalId);

/// A handle to any runtime object, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extern {
    /// A function.
    Func(FuncId),
    /// A table.
    Table(TableId),
    /// A memory.
    Memory(MemoryId),
    /// A global.
    Global(GlobalId),
}

/// A contiguous guarded virtual-address range backing a table or memory,
/// trailing guard pages included.
///
/// The layout of these ranges is the embedder's responsibility; the store
/// only records them so that a faulting address can be attributed to the
/// object whose guard region it hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    base: usize,
    len: usize,
}

impl Reservation {
    /// Creates a reservation covering `len` bytes starting at `base`.
    pub fn new(base: usize, len: usize) -> Reservation {
        assert!(len > 0, "empty reservation");
        assert!(base.checked_add(len).is_some(), "reservation wraps the address space");
        Reservation { base, len }
    }

    /// Returns the first address of the range.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Returns the length of the range in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether `addr` lies within the range.
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr - self.base < self.len
    }

    fn overlaps(&self, other: &Reservation) -> bool {
        self.base < other.base + other.len && other.base < self.base + self.len
    }
}

/// A callable function: a signature plus the native entry point the code
/// generator produced for it.
#[derive(Debug)]
pub struct FunctionInstance {
    ty: FuncType,
    body: *const VMFunctionBody,
}

// The entry point is immutable once registered and compiled code is callable
// from any thread.
unsafe impl Send for FunctionInstance {}
unsafe impl Sync for FunctionInstance {}

impl FunctionInstance {
    /// Returns the function's signature.
    pub fn ty(&self) -> &FuncType {
        &self.ty
    }

    /// Returns the function's native entry point.
    pub fn body(&self) -> *const VMFunctionBody {
        self.body
    }
}

/// A live table: its declared type and the guarded address range backing it.
#[derive(Debug)]
pub struct TableInstance {
    ty: TableType,
    reservation: Reservation,
}

impl TableInstance {
    /// Returns the table's declared type.
    pub fn ty(&self) -> &TableType {
        &self.ty
    }

    /// Returns the guarded address range backing this table.
    pub fn reservation(&self) -> Reservation {
        self.reservation
    }
}

/// A live linear memory: its declared type and the guarded address range
/// backing it.
#[derive(Debug)]
pub struct MemoryInstance {
    ty: MemoryType,
    reservation: Reservation,
}

impl MemoryInstance {
    /// Returns the memory's declared type.
    pub fn ty(&self) -> &MemoryType {
        &self.ty
    }

    /// Returns the guarded address range backing this memory.
    pub fn reservation(&self) -> Reservation {
        self.reservation
    }
}

/// A typed storage cell.
///
/// The current value is held as raw bits; reads and writes go through a
/// single atomic so that a write returns the exact value it displaced. No
/// lock is taken; ordering between racing writers is the caller's business.
#[derive(Debug)]
pub struct GlobalInstance {
    ty: GlobalType,
    value: AtomicU64,
}

impl GlobalInstance {
    /// Returns the global's declared type.
    pub fn ty(&self) -> &GlobalType {
        &self.ty
    }
}

/// The owning collection of all live runtime objects.
pub struct Store {
    functions: PrimaryMap<FuncId, FunctionInstance>,
    tables: PrimaryMap<TableId, TableInstance>,
    memories: PrimaryMap<MemoryId, MemoryInstance>,
    globals: PrimaryMap<GlobalId, GlobalInstance>,
}

impl Default for Store {
    fn default() -> Store {
        Store::new()
    }
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Store {
        Store {
            functions: PrimaryMap::new(),
            tables: PrimaryMap::new(),
            memories: PrimaryMap::new(),
            globals: PrimaryMap::new(),
        }
    }

    /// Registers a function with the given signature and native entry point.
    ///
    /// The entry point's calling convention must match the cell-buffer layout
    /// the invoke thunk for `ty` expects; see
    /// [`VMInvokeThunk`](crate::VMInvokeThunk).
    pub fn push_function(&mut self, ty: FuncType, body: *const VMFunctionBody) -> FuncId {
        log::debug!("registering function with signature {}", ty);
        self.functions.push(FunctionInstance { ty, body })
    }

    /// Registers a table backed by the given guarded reservation.
    ///
    /// Every reservation in the store must be disjoint from every other;
    /// registering an overlapping one is an embedder bug and panics.
    pub fn push_table(&mut self, ty: TableType, reservation: Reservation) -> TableId {
        self.assert_disjoint(&reservation);
        log::debug!(
            "registering table reservation {:#x}..{:#x}",
            reservation.base(),
            reservation.base() + reservation.len()
        );
        self.tables.push(TableInstance { ty, reservation })
    }

    /// Registers a memory backed by the given guarded reservation.
    ///
    /// Panics if the reservation overlaps a live table or memory.
    pub fn push_memory(&mut self, ty: MemoryType, reservation: Reservation) -> MemoryId {
        self.assert_disjoint(&reservation);
        log::debug!(
            "registering memory reservation {:#x}..{:#x}",
            reservation.base(),
            reservation.base() + reservation.len()
        );
        self.memories.push(MemoryInstance { ty, reservation })
    }

    fn assert_disjoint(&self, reservation: &Reservation) {
        for (_, table) in self.tables.iter() {
            assert!(
                !table.reservation.overlaps(reservation),
                "reservation overlaps a live table"
            );
        }
        for (_, memory) in self.memories.iter() {
            assert!(
                !memory.reservation.overlaps(reservation),
                "reservation overlaps a live memory"
            );
        }
    }

    /// Returns the function registered under `id`.
    pub fn function(&self, id: FuncId) -> &FunctionInstance {
        &self.functions[id]
    }

    /// Returns the table registered under `id`.
    pub fn table(&self, id: TableId) -> &TableInstance {
        &self.tables[id]
    }

    /// Returns the memory registered under `id`.
    pub fn memory(&self, id: MemoryId) -> &MemoryInstance {
        &self.memories[id]
    }

    /// Returns the global registered under `id`.
    pub fn global(&self, id: GlobalId) -> &GlobalInstance {
        &self.globals[id]
    }

    /// Returns the table whose guarded reservation contains `addr`, if any.
    pub fn table_owning_address(&self, addr: usize) -> Option<TableId> {
        self.tables
            .iter()
            .find(|(_, table)| table.reservation.contains(addr))
            .map(|(id, _)| id)
    }

    /// Returns the memory whose guarded reservation contains `addr`, if any.
    pub fn memory_owning_address(&self, addr: usize) -> Option<MemoryId> {
        self.memories
            .iter()
            .find(|(_, memory)| memory.reservation.contains(addr))
            .map(|(id, _)| id)
    }

    /// Returns whether `object` satisfies the required type `ty`.
    ///
    /// A kind mismatch never matches. Functions and globals require exact
    /// type equality. A table matches when its element type is equal and its
    /// size bounds are a subset of the required bounds; a memory applies the
    /// same subset rule to its size bounds alone. The subset rule (rather
    /// than equality) lets an object with narrower declared bounds satisfy a
    /// wider request.
    pub fn is_a(&self, object: Extern, ty: &ExternType) -> bool {
        match (object, ty) {
            (Extern::Func(id), ExternType::Func(required)) => self.functions[id].ty == *required,
            (Extern::Global(id), ExternType::Global(required)) => self.globals[id].ty == *required,
            (Extern::Table(id), ExternType::Table(required)) => {
                let table = &self.tables[id];
                table.ty.element() == required.element()
                    && table.ty.limits().is_subset_of(required.limits())
            }
            (Extern::Memory(id), ExternType::Memory(required)) => {
                let memory = &self.memories[id];
                memory.ty.limits().is_subset_of(required.limits())
            }
            _ => false,
        }
    }

    /// Creates a new global of the given type, initialized to `initial`.
    pub fn create_global(&mut self, ty: GlobalType, initial: Val) -> GlobalId {
        debug_assert_eq!(initial.ty(), ty.content());
        self.globals.push(GlobalInstance {
            ty,
            value: AtomicU64::new(initial.to_bits()),
        })
    }

    /// Returns a snapshot of the global's current value, tagged with its
    /// declared content type.
    pub fn global_value(&self, id: GlobalId) -> Val {
        let global = &self.globals[id];
        Val::from_bits(global.ty.content(), global.value.load(SeqCst))
    }

    /// Writes `new_value` into the global, returning the value it displaced.
    ///
    /// Writing an immutable global or a value of the wrong type is an
    /// embedder bug, not a guest-reachable condition, and panics.
    pub fn set_global_value(&self, id: GlobalId, new_value: Val) -> Val {
        let global = &self.globals[id];
        assert!(global.ty.is_mutable(), "write to an immutable global");
        assert_eq!(
            new_value.ty(),
            global.ty.content(),
            "global value type mismatch"
        );
        let previous = global.value.swap(new_value.to_bits(), SeqCst);
        Val::from_bits(global.ty.content(), previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Limits, Mutability, RefType};
    use crate::values::ValType;
    use std::ptr;

    fn empty_sig() -> FuncType {
        FuncType::new(Box::new([]), None)
    }

    fn table_ty(min: u64, max: Option<u64>) -> TableType {
        TableType::new(RefType::FuncRef, Limits::new(min, max))
    }

    #[test]
    fn kind_mismatch_never_matches() {
        let mut store = Store::new();
        let func = store.push_function(empty_sig(), ptr::null());
        let global = store.create_global(
            GlobalType::new(ValType::I32, Mutability::Const),
            Val::I32(0),
        );

        let func_ty = ExternType::Func(empty_sig());
        let memory_ty = ExternType::Memory(MemoryType::new(Limits::at_least(0)));
        assert!(!store.is_a(Extern::Func(func), &memory_ty));
        assert!(!store.is_a(Extern::Global(global), &func_ty));
        assert!(store.is_a(Extern::Func(func), &func_ty));
    }

    #[test]
    fn function_signature_must_match_exactly() {
        let mut store = Store::new();
        let sig = FuncType::new(Box::new([ValType::I32]), Some(ValType::I64));
        let func = store.push_function(sig.clone(), ptr::null());

        assert!(store.is_a(Extern::Func(func), &ExternType::Func(sig)));
        let wider = FuncType::new(Box::new([ValType::I32, ValType::I32]), Some(ValType::I64));
        assert!(!store.is_a(Extern::Func(func), &ExternType::Func(wider)));
    }

    #[test]
    fn table_bounds_use_the_subset_rule() {
        let mut store = Store::new();
        let table = store.push_table(table_ty(2, Some(8)), Reservation::new(0x1000, 0x1000));

        assert!(store.is_a(
            Extern::Table(table),
            &ExternType::Table(table_ty(1, Some(16)))
        ));
        assert!(store.is_a(Extern::Table(table), &ExternType::Table(table_ty(1, None))));
        assert!(!store.is_a(
            Extern::Table(table),
            &ExternType::Table(table_ty(4, Some(16)))
        ));
        assert!(!store.is_a(
            Extern::Table(table),
            &ExternType::Table(table_ty(1, Some(4)))
        ));
    }

    #[test]
    fn memory_bounds_use_the_subset_rule() {
        let mut store = Store::new();
        let memory = store.push_memory(
            MemoryType::new(Limits::new(1, Some(4))),
            Reservation::new(0x10000, 0x1000),
        );

        let wider = ExternType::Memory(MemoryType::new(Limits::new(0, Some(8))));
        let narrower = ExternType::Memory(MemoryType::new(Limits::new(0, Some(2))));
        assert!(store.is_a(Extern::Memory(memory), &wider));
        assert!(!store.is_a(Extern::Memory(memory), &narrower));
    }

    #[test]
    fn address_ownership_is_total_and_exclusive() {
        let mut store = Store::new();
        let table = store.push_table(table_ty(0, None), Reservation::new(0x1000, 0x1000));
        let memory = store.push_memory(
            MemoryType::new(Limits::at_least(0)),
            Reservation::new(0x4000, 0x1000),
        );

        assert_eq!(store.table_owning_address(0x1800), Some(table));
        assert_eq!(store.memory_owning_address(0x1800), None);
        assert_eq!(store.memory_owning_address(0x4fff), Some(memory));
        assert_eq!(store.table_owning_address(0x4fff), None);
        assert_eq!(store.table_owning_address(0x2000), None);
        assert_eq!(store.memory_owning_address(0x2000), None);
    }

    #[test]
    #[should_panic(expected = "overlaps")]
    fn overlapping_reservations_are_rejected() {
        let mut store = Store::new();
        store.push_table(table_ty(0, None), Reservation::new(0x1000, 0x1000));
        store.push_memory(
            MemoryType::new(Limits::at_least(0)),
            Reservation::new(0x1fff, 0x1000),
        );
    }

    #[test]
    fn global_set_returns_the_previous_value() {
        let mut store = Store::new();
        let global = store.create_global(
            GlobalType::new(ValType::I64, Mutability::Var),
            Val::I64(1),
        );

        assert_eq!(store.set_global_value(global, Val::I64(2)), Val::I64(1));
        assert_eq!(store.global_value(global), Val::I64(2));
    }

    #[test]
    #[should_panic(expected = "immutable")]
    fn writing_an_immutable_global_panics() {
        let mut store = Store::new();
        let global = store.create_global(
            GlobalType::new(ValType::I32, Mutability::Const),
            Val::I32(0),
        );
        store.set_global_value(global, Val::I32(1));
    }

    #[test]
    #[should_panic(expected = "type mismatch")]
    fn writing_the_wrong_value_type_panics() {
        let mut store = Store::new();
        let global = store.create_global(
            GlobalType::new(ValType::I32, Mutability::Var),
            Val::I32(0),
        );
        store.set_global_value(global, Val::F64(0));
    }
}
