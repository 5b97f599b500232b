mod engine_tests;
mod operation_tests;

use std::sync::Arc;

use flowcore::{
    config::EngineConfig,
    eval::{ContainerKind, ContainerRef},
    operation::{
        handler::LeftOperandHandlerRegistry,
        memory::{BusinessDataHandler, DataHandler, InMemoryStore, TransientDataHandler},
        LeftOperandHandler,
    },
    script::{InMemoryPartitionLoader, PartitionLoader},
    EngineParts, ExpressionEngine,
};
use lazy_static::lazy_static;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    // テストの前に一度だけ実行したい処理
    // tracing_subscriberの初期化
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

lazy_static! {
    pub static ref ORDER_DOCUMENT: String = r#"<order id="7">
  <customer>ACME</customer>
  <total>42</total>
  <items>
    <item sku="a-1">pen</item>
    <item sku="b-2">ink</item>
  </items>
</order>"#
        .to_string();
}

pub fn container() -> ContainerRef {
    ContainerRef::new(1, ContainerKind::ProcessInstance)
}

/// In-memory stores and handlers shared by one engine.
pub struct Fixture {
    pub engine: ExpressionEngine,
    pub loader: Arc<InMemoryPartitionLoader>,
    pub data: Arc<InMemoryStore>,
    pub transient: Arc<InMemoryStore>,
    pub business: Arc<InMemoryStore>,
    pub business_handler: Arc<BusinessDataHandler>,
}

pub fn setup_engine(config: EngineConfig) -> Fixture {
    let data = Arc::new(InMemoryStore::new());
    let transient = Arc::new(InMemoryStore::new());
    let business = Arc::new(InMemoryStore::new());
    let business_handler = Arc::new(BusinessDataHandler::new(business.clone()));

    let mut handlers = LeftOperandHandlerRegistry::new();
    handlers
        .register(Arc::new(DataHandler::new(data.clone())))
        .unwrap();
    handlers
        .register(Arc::new(TransientDataHandler::new(transient.clone())))
        .unwrap();
    handlers
        .register(business_handler.clone() as Arc<dyn LeftOperandHandler>)
        .unwrap();

    let loader = Arc::new(InMemoryPartitionLoader::new());
    let parts = EngineParts::new(handlers, loader.clone() as Arc<dyn PartitionLoader>);
    let engine = ExpressionEngine::new(config, parts).unwrap();

    Fixture {
        engine,
        loader,
        data,
        transient,
        business,
        business_handler,
    }
}
