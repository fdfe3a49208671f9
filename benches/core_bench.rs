//! Benchmarks for compose-ir core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use compose_ir::containerizer::ReuseDockerfileContainerizer;
use compose_ir::core::assembler::assemble;
use compose_ir::core::interpolate::interpolate;
use compose_ir::core::naming::host_path_volume_name;
use compose_ir::core::parser::{parse_compose, LoadOptions};
use compose_ir::core::plan::{Plan, PlanService};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

const COMPOSE: &str = r#"
services:
  web:
    image: ${REGISTRY:-docker.io}/acme/web:${TAG}
    command: ["npm", "start"]
    ports: ["8080:80", "8443:443", "9000-9002:9000-9002"]
    expose: ["80", "3000/udp"]
    environment:
      NODE_ENV: production
      API_URL: http://api:8000
    volumes:
      - /srv/static:/usr/share/static:ro
      - uploads:/uploads
    tmpfs: ["/run", "/tmp:size=64m"]
    secrets: [api_key]
    healthcheck:
      test: ["CMD", "curl", "-f", "http://localhost"]
      interval: 30s
      timeout: 5s
      retries: 3
    deploy:
      replicas: 3
      resources:
        limits:
          cpus: "0.75"
          memory: 512M
  api:
    image: acme/api
volumes:
  uploads: {}
secrets:
  api_key:
    external: true
"#;

fn options() -> LoadOptions {
    LoadOptions::default()
        .with_working_dir("/project")
        .with_env("TAG", "1.4.2")
}

fn bench_parse_compose(c: &mut Criterion) {
    let options = options();
    let path = Path::new("/project/compose.yaml");
    c.bench_function("parse_compose", |b| {
        b.iter(|| {
            let loaded = parse_compose(black_box(COMPOSE.as_bytes()), path, &options).unwrap();
            black_box(loaded);
        });
    });
}

fn bench_convert_service(c: &mut Criterion) {
    let options = options();
    let path = Path::new("/project/compose.yaml");
    let plan = Plan {
        name: "bench".to_string(),
        root_dir: PathBuf::from("/project"),
    };
    let service = PlanService::new("web");
    c.bench_function("convert_service", |b| {
        b.iter(|| {
            let loaded = parse_compose(COMPOSE.as_bytes(), path, &options).unwrap();
            let translation =
                assemble(loaded, &plan, &service, &ReuseDockerfileContainerizer).unwrap();
            black_box(translation);
        });
    });
}

fn bench_interpolate(c: &mut Criterion) {
    let env: IndexMap<String, String> = (0..64)
        .map(|i| (format!("VAR_{i}"), format!("value-{i}")))
        .collect();
    let mut group = c.benchmark_group("interpolate");
    for refs in [1, 8, 32] {
        let template: String = (0..refs).map(|i| format!("${{VAR_{i}:-x}}/")).collect();
        group.bench_with_input(BenchmarkId::from_parameter(refs), &template, |b, template| {
            b.iter(|| black_box(interpolate(black_box(template), &env).unwrap()));
        });
    }
    group.finish();
}

fn bench_host_path_volume_name(c: &mut Criterion) {
    let mut group = c.benchmark_group("host_path_volume_name");
    for depth in [2, 8, 32] {
        let path: PathBuf = std::iter::once("/".to_string())
            .chain((0..depth).map(|i| format!("dir{i}")))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(depth), &path, |b, path| {
            b.iter(|| black_box(host_path_volume_name(black_box(path))));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_parse_compose,
    bench_convert_service,
    bench_interpolate,
    bench_host_path_volume_name
);
criterion_main!(benches);
