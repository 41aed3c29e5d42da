//! Store deadlines under composite operations.

mod common;

use std::sync::Mutex;
use std::time::Duration;

use common::{fields, GOV};

use orgchart_core::{
    AppliedStep, Command, Entity, EntityCounters, EntityId, EntityPatch, EntityRecord, Operation,
    RelType, Relationship, RelationshipFilter, SearchCriteria,
};
use orgchart_engine::{EngineError, Result, TransactionEngine};
use orgchart_graph::{EntityStore, GraphError, InMemoryStore, TimeoutStore};

const DEADLINE: Duration = Duration::from_millis(500);

/// In-memory store whose Nth update, once armed, never answers.
#[derive(Default)]
struct StallingStore {
    inner: InMemoryStore,
    updates_left: Mutex<Option<usize>>,
}

impl StallingStore {
    fn stall_on_update(&self, nth: usize) {
        *self.updates_left.lock().unwrap() = Some(nth);
    }

    fn should_stall(&self) -> bool {
        let mut left = self.updates_left.lock().unwrap();
        match *left {
            Some(1) => {
                *left = None;
                true
            }
            Some(n) => {
                *left = Some(n - 1);
                false
            }
            None => false,
        }
    }
}

impl EntityStore for StallingStore {
    async fn create_entity(&self, entity: &Entity) -> std::result::Result<EntityRecord, GraphError> {
        self.inner.create_entity(entity).await
    }

    async fn update_entity(
        &self,
        id: &EntityId,
        patch: &EntityPatch,
    ) -> std::result::Result<EntityRecord, GraphError> {
        if self.should_stall() {
            std::future::pending::<()>().await;
        }
        self.inner.update_entity(id, patch).await
    }

    async fn search_entities(
        &self,
        criteria: &SearchCriteria,
    ) -> std::result::Result<Vec<EntityRecord>, GraphError> {
        self.inner.search_entities(criteria).await
    }

    async fn get_related_entities(
        &self,
        id: &EntityId,
        filter: &RelationshipFilter,
    ) -> std::result::Result<Vec<Relationship>, GraphError> {
        self.inner.get_related_entities(id, filter).await
    }
}

type Engine = TransactionEngine<TimeoutStore<StallingStore>>;

async fn engine() -> Engine {
    let store = TimeoutStore::new(StallingStore::default(), DEADLINE);
    let counters = EntityCounters::seeded(["minister", "department", "citizen", "document"]);
    let mut engine = TransactionEngine::new(store, counters);
    engine.bootstrap_government().await.unwrap();
    engine
}

async fn run(engine: &mut Engine, operation: Operation, pairs: &[(&str, &str)]) -> Result<u32> {
    let command = Command::from_fields(operation, &fields(pairs)).unwrap();
    engine.apply(&command).await
}

async fn add(engine: &mut Engine, parent: &str, child: &str, child_type: &str, tx: &str) {
    let (parent_type, rel_type) = if parent == GOV {
        ("government", "AS_MINISTER")
    } else {
        ("minister", "AS_DEPARTMENT")
    };
    run(
        engine,
        Operation::AddOrganisation,
        &[
            ("parent", parent),
            ("child", child),
            ("date", "2024-02-01"),
            ("parent_type", parent_type),
            ("child_type", child_type),
            ("rel_type", rel_type),
            ("transaction_id", tx),
        ],
    )
    .await
    .unwrap();
}

async fn edge(engine: &Engine, source: &str, target: &str) -> Option<Relationship> {
    engine
        .store()
        .inner()
        .inner
        .relationship(source, &format!("{source}_{target}"))
        .await
}

fn timed_out(err: &EngineError) -> bool {
    matches!(
        err,
        EngineError::Store { source: GraphError::Timeout { millis: 500 }, .. }
    )
}

#[tokio::test(start_paused = true)]
async fn rename_stops_at_stalled_write_and_keeps_earlier_steps() {
    let mut engine = engine().await;
    add(&mut engine, GOV, "Ministry of Health", "minister", "TX00001").await;
    add(&mut engine, "Ministry of Health", "Health Planning", "department", "TX00002").await;

    // create, attach to government, attach department, then the stalled detach
    engine.store().inner().stall_on_update(3);
    let err = run(
        &mut engine,
        Operation::RenameMinister,
        &[
            ("old", "Ministry of Health"),
            ("new", "Ministry of Wellness"),
            ("date", "2024-03-01"),
            ("transaction_id", "TX00010"),
        ],
    )
    .await
    .unwrap_err();

    assert!(timed_out(&err), "unexpected error: {err}");
    let steps = engine.take_steps();
    assert_eq!(steps.len(), 3);
    assert!(matches!(steps[0], AppliedStep::CreateEntity { .. }));
    assert!(matches!(steps[2], AppliedStep::Attach { rel_type: RelType::AsDepartment, .. }));
    assert_eq!(engine.counters().get("minister"), Some(2));

    // Nothing after the stalled write ran.
    assert!(edge(&engine, "TX00001_min_1", "TX00002_dep_1").await.unwrap().is_active());
    assert!(edge(&engine, "gov_01", "TX00001_min_1").await.unwrap().is_active());
    assert!(edge(&engine, "TX00001_min_1", "TX00010_min_2").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn merge_stops_between_old_ministers_on_timeout() {
    let mut engine = engine().await;
    add(&mut engine, GOV, "Ministry of Trade", "minister", "TX00001").await;
    add(&mut engine, GOV, "Ministry of Commerce", "minister", "TX00002").await;
    add(&mut engine, "Ministry of Trade", "Export Board", "department", "TX00003").await;

    // Trade takes five updates; the sixth retires Commerce.
    engine.store().inner().stall_on_update(6);
    let err = run(
        &mut engine,
        Operation::MergeMinisters,
        &[
            ("old", "[Ministry of Trade, Ministry of Commerce]"),
            ("new", "Ministry of Trade and Commerce"),
            ("date", "2024-04-01"),
            ("transaction_id", "TX00004"),
        ],
    )
    .await
    .unwrap_err();

    assert!(timed_out(&err), "unexpected error: {err}");
    assert_eq!(engine.take_steps().len(), 6);
    assert_eq!(
        edge(&engine, "TX00001_min_1", "TX00004_min_3").await.unwrap().name,
        RelType::MergedInto
    );
    assert!(edge(&engine, "gov_01", "TX00002_min_2").await.unwrap().is_active());
    assert!(edge(&engine, "TX00002_min_2", "TX00004_min_3").await.is_none());
}
