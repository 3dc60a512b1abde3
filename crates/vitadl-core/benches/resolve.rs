//! Symbol resolution benchmarks.
//!
//! Measures the read-side lookup path: database parse, module/symbol hash
//! lookups, and the full resolve call through a trivial export resolver.

use std::fmt::Write as _;

use criterion::{Criterion, criterion_group, criterion_main};
use vitadl_core::{
    Address, DlContext, ExportResolver, ModuleLoader, PlatformError, RuntimeId,
};

struct NullPlatform;

impl ModuleLoader for NullPlatform {
    fn load_by_path(&self, _path: &str) -> Result<RuntimeId, PlatformError> {
        Ok(RuntimeId(1))
    }

    fn load_by_service_id(&self, _service_id: u32) -> Result<(), PlatformError> {
        Ok(())
    }

    fn unload_by_runtime_id(&self, _id: RuntimeId) -> Result<(), PlatformError> {
        Ok(())
    }

    fn unload_by_service_id(&self, _service_id: u32) -> Result<(), PlatformError> {
        Ok(())
    }
}

struct IdentityResolver;

impl ExportResolver for IdentityResolver {
    fn resolve_export(&self, _identity: &str, nid: u32) -> Result<Address, PlatformError> {
        Ok(nid as Address)
    }
}

/// A source with `modules` modules of `symbols` symbols each.
fn synthetic_source(modules: u32, symbols: u32) -> String {
    let mut source = String::new();
    for m in 0..modules {
        let _ = writeln!(source, "$s SceBench{m:03}");
        let _ = writeln!(source, "#{:#010x}", 0x100 + m);
        for s in 0..symbols {
            let _ = writeln!(source, "*sceBench{m:03}Fn{s:04} {:#010x}", (m << 16) | s);
        }
    }
    source
}

fn bench_populate(c: &mut Criterion) {
    let source = synthetic_source(32, 64);
    c.bench_function("populate_32x64", |b| {
        b.iter(|| {
            let ctx = DlContext::new(Box::new(NullPlatform), Box::new(IdentityResolver));
            ctx.populate_str(criterion::black_box(&source), "bench.txt")
                .unwrap();
        });
    });
}

fn bench_resolve_hot(c: &mut Criterion) {
    let ctx = DlContext::new(Box::new(NullPlatform), Box::new(IdentityResolver));
    ctx.populate_str(&synthetic_source(32, 64), "bench.txt")
        .unwrap();
    let handle = ctx.open("SceBench016").unwrap();

    c.bench_function("resolve_hot", |b| {
        b.iter(|| {
            criterion::black_box(
                ctx.resolve(Some(&handle), criterion::black_box("sceBench016Fn0032"))
                    .unwrap(),
            );
        });
    });

    ctx.close(handle).unwrap();
}

fn bench_resolve_default_list(c: &mut Criterion) {
    let ctx = DlContext::new(Box::new(NullPlatform), Box::new(IdentityResolver));
    ctx.populate_str(
        "$p SceLibKernel\n*sceKernelExitProcess 0x7595D9AA\n",
        "bench.txt",
    )
    .unwrap();

    c.bench_function("resolve_default_list", |b| {
        b.iter(|| {
            criterion::black_box(
                ctx.resolve(None, criterion::black_box("sceKernelExitProcess"))
                    .unwrap(),
            );
        });
    });
}

criterion_group!(
    benches,
    bench_populate,
    bench_resolve_hot,
    bench_resolve_default_list
);
criterion_main!(benches);
