use std::hint::black_box;

use common::{ProductId, SkuId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{AddressInput, Money, OrderLineRequest, OrderRequest};
use order_store::InMemoryOrderStore;
use saga::{
    IdAllocator, InMemoryCart, InMemoryCatalog, InMemoryEventNotifier, InMemoryInventory,
    OrderSubmissionCoordinator, SaleStatus, SnowflakeIdAllocator, SubmissionConfig,
};

fn request() -> OrderRequest {
    let line = |id: u64, qty: u32, cents: i64| OrderLineRequest {
        product_id: ProductId::new(id),
        sku_id: SkuId::new(id * 10),
        sku_name: format!("sku-{id}"),
        product_name: format!("product-{id}"),
        unit_price: Money::from_cents(cents),
        quantity: qty,
        picture: None,
        origin_cart_line_id: None,
    };
    let lines = vec![line(1, 2, 1000), line(2, 1, 500)];
    OrderRequest {
        user_id: UserId::new(1),
        address: AddressInput {
            receiver: "Bench".to_string(),
            mobile: "13900000000".to_string(),
            province: "Guangdong".to_string(),
            city: "Shenzhen".to_string(),
            area: "Nanshan".to_string(),
            detail: "Keyuan Road 1".to_string(),
            postal_code: None,
        },
        remarks: String::new(),
        total: lines.iter().fold(Money::zero(), |acc, l| {
            acc.checked_add(l.line_total().unwrap()).unwrap()
        }),
        total_count: 3,
        lines,
    }
}

fn bench_next_id(c: &mut Criterion) {
    let ids = SnowflakeIdAllocator::new(1).unwrap();

    c.bench_function("saga/next_id", |b| {
        b.iter(|| black_box(ids.next_id()));
    });
}

fn bench_submit_happy_path(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let catalog = InMemoryCatalog::new();
    let inventory = InMemoryInventory::new();
    for id in [1, 2] {
        catalog.add_product(ProductId::new(id), SaleStatus::OnSale);
        catalog.add_sku(SkuId::new(id * 10), SaleStatus::OnSale);
        inventory.set_stock(SkuId::new(id * 10), u32::MAX);
    }
    let coordinator = OrderSubmissionCoordinator::new(
        InMemoryOrderStore::new(),
        SnowflakeIdAllocator::new(1).unwrap(),
        catalog,
        inventory,
        InMemoryCart::new(),
        InMemoryEventNotifier::new(),
        SubmissionConfig::default(),
    );

    c.bench_function("saga/submit_happy_path", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(coordinator.submit(request()).await.unwrap());
            });
        });
    });
}

criterion_group!(benches, bench_next_id, bench_submit_happy_path);
criterion_main!(benches);
