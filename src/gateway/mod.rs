mod pending_gateway;
#[cfg(test)]
mod tests;

pub use pending_gateway::Gateway;
