use tonic_build::manual::{Builder, Method, Service};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Messages are hand-written prost structs in src/grpc/proto.rs, so the
    // service stubs are generated without protoc.
    let service = Service::builder()
        .name("ThrottleService")
        .package("throttle.v1")
        .method(
            Method::builder()
                .name("check")
                .route_name("Check")
                .input_type("crate::grpc::proto::CheckRequest")
                .output_type("crate::grpc::proto::CheckResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .method(
            Method::builder()
                .name("list_policies")
                .route_name("ListPolicies")
                .input_type("crate::grpc::proto::ListPoliciesRequest")
                .output_type("crate::grpc::proto::ListPoliciesResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    Builder::new().compile(&[service]);
}
