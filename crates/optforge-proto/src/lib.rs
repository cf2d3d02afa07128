pub mod common {
    pub mod v1 {
        tonic::include_proto!("optforge.common.v1");
    }
}

pub mod service {
    pub mod v1 {
        tonic::include_proto!("optforge.service.v1");
    }
}
