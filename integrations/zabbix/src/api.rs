//! Named monitoring API calls built on the dispatcher

use reqwest::Client;
use serde_json::{json, Value};
use zbxutil_core::{KillSwitch, Logger};

use crate::dispatcher::{DispatchResult, Dispatcher};
use crate::http::{AuthScheme, HttpTransport};
use crate::transport::Transport;
use crate::{Credentials, Endpoints};

/// Monitoring API client
pub struct ZabbixApi<T = HttpTransport> {
    dispatcher: Dispatcher<T>,
}

impl ZabbixApi<HttpTransport> {
    /// Build an HTTP-backed client, honouring the kill switch
    ///
    /// Non-critical callers get [`zbxutil_core::Error::KillSwitchEngaged`]
    /// while the sentinel file exists.
    pub fn connect(
        endpoints: Endpoints,
        credentials: Credentials,
        scheme: AuthScheme,
        logger: Logger,
        kill_switch: &KillSwitch,
        critical: bool,
    ) -> zbxutil_core::Result<Self> {
        let transport = HttpTransport::new(Client::new()).with_scheme(scheme);
        let dispatcher = Dispatcher::new(transport, endpoints, credentials, logger)
            .with_kill_switch(kill_switch, critical)?;
        Ok(Self::new(dispatcher))
    }
}

impl<T: Transport> ZabbixApi<T> {
    pub fn new(dispatcher: Dispatcher<T>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<T> {
        &mut self.dispatcher
    }

    pub fn logger(&self) -> &Logger {
        self.dispatcher.logger()
    }

    /// Raw call; `jsonrpc`, `id` and authentication are filled in by the transport
    pub async fn api_request(&mut self, method: &str, params: Value) -> DispatchResult<Value> {
        self.dispatcher.dispatch(method, &params).await
    }

    pub async fn create_hostgroup(&mut self, name: &str) -> DispatchResult<Value> {
        self.api_request("hostgroup.create", json!({"name": name}))
            .await
    }

    pub async fn get_hostgroup_by_name(
        &mut self,
        name: &str,
        include_hosts: bool,
    ) -> DispatchResult<Value> {
        self.api_request(
            "hostgroup.get",
            json!({
                "output": "extend",
                "filter": {"name": name},
                "selectHosts": include_hosts,
            }),
        )
        .await
    }

    /// Group id of the first group named `name`
    pub async fn get_hostgroup_id_by_name(
        &mut self,
        name: &str,
        include_hosts: bool,
    ) -> DispatchResult<Option<String>> {
        let groups = self
            .api_request(
                "hostgroup.get",
                json!({
                    "output": "groupid",
                    "filter": {"name": name},
                    "selectHosts": include_hosts,
                }),
            )
            .await?;

        Ok(first_field(&groups, "groupid"))
    }

    /// `host` and `hostid` of every host
    pub async fn get_all_host_names(&mut self) -> DispatchResult<Value> {
        self.api_request("host.get", json!({"output": ["host"]}))
            .await
    }

    pub async fn get_all_host_groups(&mut self) -> DispatchResult<Value> {
        self.api_request("hostgroup.get", json!({"output": "extend"}))
            .await
    }

    pub async fn get_hosts_by_names<S: AsRef<str>>(&mut self, names: &[S]) -> DispatchResult<Value> {
        let names: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
        self.api_request("host.get", json!({"filter": {"host": names}}))
            .await
    }

    pub async fn get_hosts_by_hostgroups<S: AsRef<str>>(
        &mut self,
        group_ids: &[S],
    ) -> DispatchResult<Value> {
        let group_ids: Vec<&str> = group_ids.iter().map(AsRef::as_ref).collect();
        self.api_request("host.get", json!({"groupids": group_ids}))
            .await
    }

    pub async fn get_maintenance_by_name(&mut self, name: &str) -> DispatchResult<Value> {
        self.api_request(
            "maintenance.get",
            json!({"output": "extend", "filter": {"name": name}}),
        )
        .await
    }

    pub async fn get_maintenance_id_by_name(&mut self, name: &str) -> DispatchResult<Option<String>> {
        let maintenances = self.get_maintenance_by_name(name).await?;
        Ok(first_field(&maintenances, "maintenanceid"))
    }
}

fn first_field(rows: &Value, field: &str) -> Option<String> {
    rows.get(0)?.get(field)?.as_str().map(str::to_string)
}
