use kube::{Api, Client, Resource};

pub mod cluster;
pub mod codec;
pub mod network_client;
pub mod operations;

pub trait GetApi {
    fn global_api<T>(&self) -> Api<T>
    where
        T: Resource<DynamicType = ()>;
}

impl GetApi for Client {
    fn global_api<T>(&self) -> Api<T>
    where
        T: Resource<DynamicType = ()>,
    {
        Api::all(self.clone())
    }
}
