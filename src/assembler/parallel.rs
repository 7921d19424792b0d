//! Parallel assembly: the largest axis is split into one slice per value and
//! the slices are assembled on a bounded set of tasks.

use crate::assembler::table::ClimateTable;
use crate::assembler::{build_table, Extent};
use crate::connectors::{ConnectorFactory, DataConnector};
use crate::error::ClimateError;
use crate::resolver::coordinates::CoordinateRange;
use crate::resolver::years::YearRange;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionAxis {
    Latitude,
    Longitude,
    Year,
}

/// The axis with the most values. Ties go to latitude, then longitude.
pub fn partition_axis(extent: &Extent) -> PartitionAxis {
    let lats = extent.latitudes.len();
    let lons = extent.longitudes.len();
    let years = extent.years.len();
    if lats >= lons && lats >= years {
        PartitionAxis::Latitude
    } else if lons >= years {
        PartitionAxis::Longitude
    } else {
        PartitionAxis::Year
    }
}

/// Splits `extent` into one slice per value of its partition axis.
pub fn partition(extent: &Extent) -> Vec<Extent> {
    match partition_axis(extent) {
        PartitionAxis::Latitude => extent
            .latitudes
            .iter()
            .map(|lat| Extent {
                latitudes: CoordinateRange::new(vec![lat]),
                ..extent.clone()
            })
            .collect(),
        PartitionAxis::Longitude => extent
            .longitudes
            .iter()
            .map(|lon| Extent {
                longitudes: CoordinateRange::new(vec![lon]),
                ..extent.clone()
            })
            .collect(),
        PartitionAxis::Year => extent
            .years
            .iter()
            .map(|year| Extent {
                years: YearRange::single(year),
                ..extent.clone()
            })
            .collect(),
    }
}

/// Assembles `extent` on up to `workers` tasks, each with its own connector.
/// Ctrl-C aborts every outstanding task and returns [`ClimateError::Interrupted`].
pub async fn build_table_parallel<F: ConnectorFactory>(
    extent: &Extent,
    factory: Arc<F>,
    workers: usize,
) -> Result<ClimateTable, ClimateError> {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    build_table_partitioned(extent, factory, workers, interrupt).await
}

/// Like [`build_table_parallel`], stopping when `interrupt` completes.
pub async fn build_table_partitioned<F, I>(
    extent: &Extent,
    factory: Arc<F>,
    workers: usize,
    interrupt: I,
) -> Result<ClimateTable, ClimateError>
where
    F: ConnectorFactory,
    I: Future<Output = ()>,
{
    factory.connector().prepare(&extent.variables)?;

    let workers = workers.max(1);
    let mut slices = partition(extent).into_iter();
    info!(
        "Splitting {} cells into {} slices along {:?} on {} workers",
        extent.cell_count(),
        slices.len(),
        partition_axis(extent),
        workers
    );

    let mut tasks = JoinSet::new();
    for slice in slices.by_ref().take(workers) {
        spawn_slice(&mut tasks, &factory, slice);
    }

    tokio::pin!(interrupt);
    let mut tables = Vec::new();
    loop {
        tokio::select! {
            joined = tasks.join_next() => {
                let Some(joined) = joined else { break };
                let outcome = joined
                    .map_err(ClimateError::WorkerFailed)
                    .and_then(|result| result);
                match outcome {
                    Ok(table) => {
                        debug!("Slice finished with {} rows", table.height());
                        tables.push(table);
                        if let Some(slice) = slices.next() {
                            spawn_slice(&mut tasks, &factory, slice);
                        }
                    }
                    Err(e) => {
                        tasks.abort_all();
                        while tasks.join_next().await.is_some() {}
                        return Err(e);
                    }
                }
            }
            _ = &mut interrupt => {
                warn!("Interrupted; stopping {} outstanding workers", tasks.len());
                tasks.abort_all();
                while tasks.join_next().await.is_some() {}
                return Err(ClimateError::Interrupted);
            }
        }
    }

    let table = ClimateTable::merge(tables)?;
    info!(
        "Merged {} rows; {} of {} longitudes kept",
        table.height(),
        table.pruned_lons().len(),
        extent.longitudes.len()
    );
    Ok(table)
}

fn spawn_slice<F: ConnectorFactory>(
    tasks: &mut JoinSet<Result<ClimateTable, ClimateError>>,
    factory: &Arc<F>,
    slice: Extent,
) {
    let factory = Arc::clone(factory);
    tasks.spawn(async move {
        let mut connector = factory.connector();
        build_table(&slice, &mut connector).await
    });
}
